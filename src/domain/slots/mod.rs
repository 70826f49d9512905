//! Slot schema: definitions, validators and the registry.

mod definition;
mod homeowner;
mod registry;
mod validator;
mod value;

pub use definition::SlotDefinition;
pub use homeowner::{
    default_optional_slots, default_required_slots, homeowner_registry, CATEGORIES,
    ZIP_CORRECTIVE_PROMPT,
};
pub use registry::{RegistryError, SlotRegistry, SlotRegistryBuilder};
pub use validator::{is_zip_code, Validator};
pub use value::{display_value, is_present, slot_set, SlotMap, SlotSet};
