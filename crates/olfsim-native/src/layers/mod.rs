//! Layer integrators
//!
//! Forward-Euler integrators for the four circuit layers. Each one is a pure
//! function of the parameters and its upstream series for a single odor, so
//! the orchestrator can run odors on independent workers.
//!
//! ```text
//! ORN (G×T) ──► LN (inhA, inhB: 1×T)
//!     │              │
//!     └──────┬───────┘
//!            ▼
//!        PN (G×T) ──► KC (Vm, spikes: N×T)
//! ```

pub mod kc;
pub mod ln;
pub mod orn;
pub mod pn;

pub use kc::{sim_kc_layer, KcScratch};
pub use ln::{sim_ln_layer, LnTraces};
pub use orn::sim_orn_layer;
pub use pn::{pn_noise, sim_pn_layer};
