use tracing::debug;

use super::{Dongle, Widget};
use crate::context;

/// Widget business logic. Looks up its accessor on every call, so it picks up
/// whatever context the calling thread has established.
#[derive(Debug, Default, Clone, Copy)]
pub struct WidgetService;

impl WidgetService {
    pub fn new() -> Self { Self }

    pub fn get_standardized_widget(&self) -> Option<Widget> {
        let mut widget = context::get().widget().get_widget()?;
        widget.standardized = true;
        debug!(widget = widget.id, "standardized widget");
        Some(widget)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DongleService;

impl DongleService {
    pub fn new() -> Self { Self }

    pub fn get_customized_dongle(&self, id: u64) -> Option<Dongle> {
        let mut dongle = context::get().dongle().get_by_id(id)?;
        dongle.customized = true;
        debug!(dongle = dongle.id, "customized dongle");
        Some(dongle)
    }
}
