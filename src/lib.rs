//! Bookkeeping for OpenFOAM parameter studies kept in an object store.
//!
//! A study sweeps input parameters over candidate values ([`expand`]); each
//! resulting case is stored as a `config.json` record ([`workspace`]) and run
//! as a batch job ([`batch`]) that fills the case's `@name@` template tokens
//! ([`fill`]) before executing the user's run script.
pub mod batch;
pub mod error;
pub mod expand;
pub mod fill;
pub mod ids;
pub mod layout;
pub mod logging;
pub mod model;
pub mod settings;
pub mod store;
pub mod workspace;

pub use error::SweepError;
