// dvreg Kernel
//
// Version registry and pointer switching for artifacts whose bytes live
// in an external content-addressed store.

pub mod adapters;
pub mod descriptor;
mod persist;
pub mod publish;
pub mod pull;
pub mod registry;
pub mod switch;
pub mod version;
pub mod workspace;
