//! Admin-page requests.
//!
//! The web layer (outside this crate) hands over the submitted action and
//! its form fields. [`AdminRequest::from_form`] turns them into a typed
//! request, and [`KnxEngine::handle_admin`] applies it. A request that
//! fails validation changes nothing.
//!
//! | action     | fields                                   |
//! |------------|------------------------------------------|
//! | `register` | `area` `line` `member` (group), `cb`     |
//! | `delete`   | `id` (assignment)                        |
//! | `phys`     | `area` `line` `member` (physical)        |
//! | `config`   | `id`, then `value` or `area` `line` `member` |
//! | `feedback` | `id`                                     |
//! | `eeprom`   | `mode` (1 save, 2 restore)               |
//! | `restore`  | none (factory defaults)                  |
//! | `reboot`   | none                                     |

use core::fmt;
use core::str::FromStr;

use log::info;

use crate::dispatch::{AssignmentId, CallbackId};
use crate::error::{AddressError, Error, RegistryError};
use crate::protocol::Address;
use crate::registry::{ConfigId, ConfigKind, FeedbackId};

use super::engine::KnxEngine;
use super::ports::StoragePort;

/// Longest text accepted for a config `value` (the largest string slot).
pub const MAX_FORM_VALUE: usize = u8::MAX as usize;

/// Raw config input; its meaning depends on the target slot's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigInput {
    /// The `value` field, if submitted.
    pub value: Option<heapless::String<MAX_FORM_VALUE>>,
    /// `area`/`line`/`member`, if all three were submitted.
    pub group_address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRequest {
    Assign { address: Address, callback: CallbackId },
    Unassign(AssignmentId),
    SetPhysicalAddress(Address),
    SetConfig { id: ConfigId, input: ConfigInput },
    InvokeFeedback(FeedbackId),
    Save,
    Restore,
    RestoreDefaults,
    Reboot,
}

/// What the host should do after a request was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    Applied,
    /// `eeprom` restore found no valid stored state.
    NothingStored,
    /// The host should restart the device.
    RebootRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminError {
    UnknownAction,
    MissingField(&'static str),
    InvalidField(&'static str),
    Engine(Error),
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAction => write!(f, "unknown action"),
            Self::MissingField(name) => write!(f, "missing field '{name}'"),
            Self::InvalidField(name) => write!(f, "invalid field '{name}'"),
            Self::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AdminError {}

impl From<Error> for AdminError {
    fn from(e: Error) -> Self {
        Self::Engine(e)
    }
}

impl From<RegistryError> for AdminError {
    fn from(e: RegistryError) -> Self {
        Self::Engine(e.into())
    }
}

impl From<AddressError> for AdminError {
    fn from(e: AddressError) -> Self {
        Self::Engine(e.into())
    }
}

// ───────────────────────────────────────────────────────────────
// Form parsing
// ───────────────────────────────────────────────────────────────

struct Form<'a>(&'a [(&'a str, &'a str)]);

impl<'a> Form<'a> {
    fn get(&self, name: &str) -> Option<&'a str> {
        self.0.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }

    fn parse<T: FromStr>(&self, name: &'static str) -> Result<T, AdminError> {
        self.get(name)
            .ok_or(AdminError::MissingField(name))?
            .trim()
            .parse()
            .map_err(|_| AdminError::InvalidField(name))
    }

    fn has_address(&self) -> bool {
        ["area", "line", "member"].iter().all(|k| self.get(k).is_some())
    }

    fn address_fields(&self) -> Result<(u8, u8, u8), AdminError> {
        Ok((self.parse("area")?, self.parse("line")?, self.parse("member")?))
    }
}

impl AdminRequest {
    /// Parse a form submission. Field values are expected already
    /// URL-decoded.
    pub fn from_form(action: &str, fields: &[(&str, &str)]) -> Result<Self, AdminError> {
        let form = Form(fields);
        match action {
            "register" => {
                let (area, line, member) = form.address_fields()?;
                Ok(Self::Assign {
                    address: Address::group(area, line, member)?,
                    callback: CallbackId(form.parse("cb")?),
                })
            }
            "delete" => Ok(Self::Unassign(AssignmentId(form.parse("id")?))),
            "phys" => {
                let (area, line, member) = form.address_fields()?;
                Ok(Self::SetPhysicalAddress(Address::physical(area, line, member)?))
            }
            "config" => {
                let id = ConfigId(form.parse("id")?);
                let value = match form.get("value") {
                    Some(v) => Some(
                        heapless::String::try_from(v)
                            .map_err(|_| AdminError::from(RegistryError::ValueTooLong))?,
                    ),
                    None => None,
                };
                let group_address = if form.has_address() {
                    let (area, line, member) = form.address_fields()?;
                    Some(Address::group(area, line, member)?)
                } else {
                    None
                };
                Ok(Self::SetConfig {
                    id,
                    input: ConfigInput { value, group_address },
                })
            }
            "feedback" => Ok(Self::InvokeFeedback(FeedbackId(form.parse("id")?))),
            "eeprom" => match form.parse::<u8>("mode")? {
                1 => Ok(Self::Save),
                2 => Ok(Self::Restore),
                _ => Err(AdminError::InvalidField("mode")),
            },
            "restore" => Ok(Self::RestoreDefaults),
            "reboot" => Ok(Self::Reboot),
            _ => Err(AdminError::UnknownAction),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Application
// ───────────────────────────────────────────────────────────────

impl KnxEngine {
    /// Apply an admin request. Persists only for `eeprom` requests.
    pub fn handle_admin(
        &mut self,
        request: AdminRequest,
        store: &mut impl StoragePort,
    ) -> Result<AdminOutcome, AdminError> {
        match request {
            AdminRequest::Assign { address, callback } => {
                self.dispatch_mut().assign(address, callback)?;
                info!("admin: {} -> callback {}", address.group_fields(), callback.0);
            }
            AdminRequest::Unassign(id) => {
                let removed = self.dispatch_mut().unassign(id)?;
                info!("admin: unassigned {}", removed.address.group_fields());
            }
            AdminRequest::SetPhysicalAddress(address) => self.set_physical_address(address),
            AdminRequest::SetConfig { id, input } => self.apply_config(id, &input)?,
            AdminRequest::InvokeFeedback(id) => self.feedbacks_mut().invoke(id)?,
            AdminRequest::Save => self.save(store)?,
            AdminRequest::Restore => {
                if !self.restore(&*store)? {
                    return Ok(AdminOutcome::NothingStored);
                }
            }
            AdminRequest::RestoreDefaults => self.restore_defaults(),
            AdminRequest::Reboot => return Ok(AdminOutcome::RebootRequested),
        }
        Ok(AdminOutcome::Applied)
    }

    fn apply_config(&mut self, id: ConfigId, input: &ConfigInput) -> Result<(), AdminError> {
        let configs = self.configs_mut();
        let value = input.value.as_deref();
        match configs.kind(id)? {
            ConfigKind::String { .. } => {
                configs.set_string(id, value.ok_or(AdminError::MissingField("value"))?)?;
            }
            ConfigKind::Int => {
                let v = value
                    .ok_or(AdminError::MissingField("value"))?
                    .trim()
                    .parse()
                    .map_err(|_| AdminError::InvalidField("value"))?;
                configs.set_int(id, v)?;
            }
            // Checkbox: an unchecked box submits nothing.
            ConfigKind::Bool => configs.set_bool(id, value == Some("on"))?,
            ConfigKind::Options(_) => {
                let v = value
                    .ok_or(AdminError::MissingField("value"))?
                    .trim()
                    .parse()
                    .map_err(|_| AdminError::InvalidField("value"))?;
                configs.set_option(id, v)?;
            }
            ConfigKind::GroupAddress => {
                let address = input.group_address.ok_or(AdminError::MissingField("area"))?;
                configs.set_group_address(id, address)?;
            }
        }
        info!("admin: config {} updated", id.0);
        Ok(())
    }
}
