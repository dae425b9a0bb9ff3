//! The default operation table.
//!
//! Every hook the engine calls has an entry here, so an application only
//! registers the names it wants to change:
//!
//! ```rust,ignore
//! let table = base_table(&config)
//!     .derive()
//!     .constant("main_file_print", json!({"text": "Hello [% name %]"}))
//!     .build();
//! ```
//!
//! | Module        | Hooks                                                        |
//! |---------------|--------------------------------------------------------------|
//! | `lifecycle`   | `pre_navigate` .. `post_print`, `run_step`, `path_info_map`  |
//! | `validation`  | `info_complete`, `ready_validate`, `validate`, ...           |
//! | `render`      | `hash_*`, `prepared_print`, `print`, `print_out`, ...        |
//! | `auth`        | `require_auth`, `get_valid_auth`, `verify_user`, ...         |
//! | `builtin`     | the forbidden, error and login steps                         |

mod auth;
mod builtin;
mod lifecycle;
mod render;
mod validation;

use crate::{config::NavConfig, navigator::Navigator};
use wayfare_core::{HookTable, HookTableBuilder};

pub use builtin::{ERROR_TEMPLATE, FORBIDDEN_TEMPLATE, LOGIN_TEMPLATE};

/// The table every application derives from.
///
/// Built-in step hooks are named after the configured forbidden, error and
/// login steps.
pub fn base_table(config: &NavConfig) -> HookTable<Navigator> {
    base_builder(config).build()
}

pub(crate) fn base_builder(config: &NavConfig) -> HookTableBuilder<Navigator> {
    let builder = HookTable::builder();
    let builder = lifecycle::register(builder);
    let builder = validation::register(builder);
    let builder = render::register(builder);
    let builder = auth::register(builder);
    builtin::register(builder, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_table_covers_the_lifecycle() {
        let table = base_table(&NavConfig::default());
        for name in [
            "pre_navigate",
            "post_navigate",
            "pre_loop",
            "post_loop",
            "morph",
            "unmorph",
            "path_info_map",
            "run_step",
            "pre_step",
            "skip",
            "prepare",
            "info_complete",
            "finalize",
            "post_step",
            "prepared_print",
            "print",
            "post_print",
            "require_auth",
            "get_valid_auth",
            "history",
        ] {
            assert!(table.contains(name), "missing {name}");
        }
        assert!(table.contains("__forbidden_file_print"));
        assert!(table.contains("__login_require_auth"));
    }

    #[test]
    fn test_builtin_names_follow_config() {
        let config = NavConfig::default().with_forbidden_step("denied");
        let table = base_table(&config);
        assert!(table.contains("denied_info_complete"));
        assert!(!table.contains("__forbidden_info_complete"));
    }
}
