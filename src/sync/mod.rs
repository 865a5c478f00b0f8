//! Synchronization and Concurrency Support
//!
//! - **Primitives** (`primitives`): [`CriticalSectionCell`], the brief,
//!   interrupt-safe section guarding queue, descriptor and channel state
//! - **Signal** (`signal`): [`WorkSignal`], the dispatcher's counting
//!   wake-up, and with the `std` feature a condvar-backed [`Semaphore`]
//!
//! # Example
//!
//! ```ignore
//! use unipro_tx_dma::sync::{Semaphore, WorkSignal};
//!
//! let work = Semaphore::new(0);
//! work.post();
//! work.wait();
//! ```

mod primitives;
mod signal;

pub use primitives::CriticalSectionCell;
#[cfg(feature = "std")]
pub use signal::Semaphore;
pub use signal::WorkSignal;
