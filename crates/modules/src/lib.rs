//! The standard per-hand controller modules and their registration.
//!
//! Every module exists once per hand and is registered as `Left<Name>` /
//! `Right<Name>`.

pub mod equip;
pub mod far_grab;
pub mod far_trigger;
pub mod near_grab;
pub mod near_trigger;
pub mod overlay_laser;
mod support;
pub mod teleport;
pub mod web_laser;

pub use equip::EquipEntity;
pub use far_grab::FarGrabEntity;
pub use far_trigger::FarTriggerEntity;
pub use near_grab::NearGrabEntity;
pub use near_trigger::NearTriggerEntity;
pub use overlay_laser::OverlayLaserInput;
pub use support::module_name;
pub use teleport::Teleporter;
pub use web_laser::WebEntityLaserInput;

use handspace_common::Hand;
use handspace_dispatch::{DispatchConfig, DispatchModule, Dispatcher, ModuleKey, RegistryError};

/// One hand's standard modules, in priority order.
fn for_hand(hand: Hand, config: &DispatchConfig) -> Vec<(&'static str, Box<dyn DispatchModule>)> {
    let mut modules: Vec<(&'static str, Box<dyn DispatchModule>)> = Vec::with_capacity(8);
    modules.push((Teleporter::NAME, Box::new(Teleporter::new(hand, config))));
    modules.push((NearTriggerEntity::NAME, Box::new(NearTriggerEntity::new(hand, config))));
    modules.push((NearGrabEntity::NAME, Box::new(NearGrabEntity::new(hand, config))));
    modules.push((OverlayLaserInput::NAME, Box::new(OverlayLaserInput::new(hand, config))));
    modules.push((EquipEntity::NAME, Box::new(EquipEntity::new(hand, config))));
    modules.push((FarTriggerEntity::NAME, Box::new(FarTriggerEntity::new(hand, config))));
    modules.push((FarGrabEntity::NAME, Box::new(FarGrabEntity::new(hand, config))));
    modules.push((WebEntityLaserInput::NAME, Box::new(WebEntityLaserInput::new(hand, config))));
    modules
}

/// Fresh instances of every standard module for both hands, named.
pub fn standard_modules(config: &DispatchConfig) -> Vec<(String, Box<dyn DispatchModule>)> {
    Hand::ALL
        .into_iter()
        .flat_map(|hand| {
            for_hand(hand, config)
                .into_iter()
                .map(move |(base, module)| (module_name(hand, base), module))
        })
        .collect()
}

/// Enable every standard module on `dispatcher`.
pub fn register_standard(
    dispatcher: &mut Dispatcher,
    config: &DispatchConfig,
) -> Result<Vec<ModuleKey>, RegistryError> {
    let mut keys = Vec::new();
    for (name, module) in standard_modules(config) {
        keys.push(dispatcher.enable(name, module)?);
    }
    tracing::info!(count = keys.len(), "standard modules registered");
    Ok(keys)
}

pub fn crate_info() -> &'static str {
    "handspace-modules v0.1.0"
}
