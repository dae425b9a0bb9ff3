//! # Routing
//!
//! Path-info maps turn the extra path of a request URL into form fields.
//!
//! | Map | Applied | Typical pattern |
//! |-----|---------|-----------------|
//! | base map | before the path is built | `/{step}` selects the step |
//! | step map | when a step starts | `/{id}` captures a record id |

pub mod path_info;

pub use path_info::PathInfoMap;
