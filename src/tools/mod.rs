//! The built-in time tools.
//!
//! | Tool | Cacheable |
//! |------|-----------|
//! | `get_current_time` | no |
//! | `convert_timezone` | yes, 300 s |
//! | `get_religious_calendar` | no |
//! | `get_astronomical_info` | no |

pub mod astronomical_info;
pub mod convert_timezone;
pub mod current_time;
pub mod format;
pub mod religious_calendar;

use std::sync::Arc;

use crate::error::RegistryError;
use crate::mcp::registry::ToolRegistry;
use crate::mcp::tool::Tool;
use crate::services::clock::Clock;

pub use astronomical_info::GetAstronomicalInfo;
pub use convert_timezone::ConvertTimezone;
pub use current_time::GetCurrentTime;
pub use religious_calendar::GetReligiousCalendar;

/// Every built-in tool, sharing one clock.
#[must_use]
pub fn default_tools(clock: &Arc<dyn Clock>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GetCurrentTime::new(Arc::clone(clock))),
        Arc::new(ConvertTimezone::new(Arc::clone(clock))),
        Arc::new(GetReligiousCalendar),
        Arc::new(GetAstronomicalInfo),
    ]
}

/// Registers [`default_tools`] into `registry`.
///
/// # Errors
///
/// Returns an error if a tool reports a blank name.
pub fn register_default_tools(
    registry: &ToolRegistry,
    clock: &Arc<dyn Clock>,
) -> Result<(), RegistryError> {
    registry.register_all(default_tools(clock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::SystemClock;

    #[test]
    fn registers_four_tools() {
        let registry = ToolRegistry::new();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        register_default_tools(&registry, &clock).unwrap();

        assert_eq!(
            registry.tool_names(),
            [
                "get_current_time",
                "convert_timezone",
                "get_religious_calendar",
                "get_astronomical_info"
            ]
        );
        assert_eq!(registry.cacheable_tools().len(), 1);
    }
}
