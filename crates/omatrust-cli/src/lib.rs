//! # omatrust-cli — OMATrust Command-Line Interface
//!
//! Exposes every public identity and verification operation as a
//! subcommand. Results are printed to stdout as pretty JSON; logs go to
//! stderr.
//!
//! ## Subcommands
//!
//! - `normalize`, `build`: CAIP-10 account identifiers
//! - `did`: canonicalization, DID hash, index address, validation
//! - `evidence`: controller evidence over DNS and did.json
//! - `hash`: canonical JSON digests of files and URLs
//! - `verify`: compare a URL's digest with a committed hash
//!
//! ## Exit Codes
//!
//! `0` on success or a positive check, `1` on an invalid input or a
//! negative check, `2` on an operational error.
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to `omatrust-core` and `omatrust-client`; no
//!   identity rules live here.

pub mod account;
pub mod did;
pub mod evidence;
pub mod hash;
pub mod output;
