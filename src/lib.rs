// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![warn(unused_results)]
#![warn(unused_qualifications)]
// Cast hygiene
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Interactive molecular viewer core built on wgpu.
//!
//! Molscope parses a molecular-structure file (XYZ, PDB or SDF) into a
//! [`structure::Structure`], animates it with a deterministic kinematic
//! [`simulation::SimulationState`], and draws instanced spheres and
//! cylinders through any [`gpu::GraphicsContext`].
//!
//! # Key entry points
//!
//! - [`session::Session`] - one drawing surface, one loaded molecule
//! - [`io::parse`] - bytes plus format tag to a structure
//! - [`gpu::RenderContext`] - wgpu backend (window, canvas or offscreen)
//! - [`gpu::HeadlessContext`] - recording backend for tests and validation
//! - [`options::ViewerOptions`] - runtime configuration (parsing,
//!   simulation, camera, lighting, appearance)
//!
//! # Frame loop
//!
//! The host owns the loop. Once per tick it calls
//! [`Session::update_time`](session::Session::update_time) and then
//! [`Session::render`](session::Session::render); nothing inside the crate
//! spawns threads or suspends.

pub mod camera;
pub mod error;
pub mod gpu;
pub mod io;
pub mod options;
pub mod renderer;
pub mod session;
pub mod simulation;
pub mod structure;
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod web;

pub use error::ViewerError;
pub use gpu::{GraphicsContext, HeadlessContext, RenderContext};
pub use options::ViewerOptions;
pub use session::{Session, SessionState};

/// One-time process setup: panic hook and log backend.
///
/// Safe to call any number of times; only the first call has an effect.
pub fn init() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        #[cfg(all(feature = "web", target_arch = "wasm32"))]
        {
            console_error_panic_hook::set_once();
            let _ = console_log::init_with_level(log::Level::Info);
        }
        #[cfg(feature = "binary")]
        {
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("info"),
            )
            .try_init();
        }
        log::debug!("molscope {} initialized", env!("CARGO_PKG_VERSION"));
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init();
        super::init();
    }
}
