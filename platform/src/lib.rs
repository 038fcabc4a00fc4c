// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! This crate mainly revolves around the [`Platform`] trait, which can be
//! implemented to provide a "platform implementation" for the game client.
//! Otherwise, this crate contains the pieces of platform-adjacent logic which
//! are the same on every target and are needed to implement or use
//! [`Platform`]: the error model, the internal text encoding, the secret
//! obfuscation cipher, and a few small utilities.
//!
//! This is split off of the main client crates so that the client and the
//! platform implementations can be compiled independently, and so that a
//! platform implementation never needs to depend on (or link) another one.
//! Backends are picked at build time by depending on the right crate, never
//! by a runtime branch.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

mod args;
mod dynlib;
mod encrypt;
mod error;
mod fs;
mod logger;
mod mem;
mod net;
mod ping;
mod sync;
mod text;
mod time;

use alloc::string::String;

pub use args::*;
pub use dynlib::*;
pub use encrypt::*;
pub use error::*;
pub use fs::*;
pub use logger::*;
pub use mem::*;
pub use net::*;
pub use ping::*;
pub use sync::*;
pub use text::*;
pub use time::*;

/// A trait for using platform-dependent features from the client without
/// depending on any platform implementation directly. A full implementation
/// implements this trait and the per-concern traits it builds on:
/// [`FileSystem`], [`Threading`], [`Sockets`], [`DynamicLibraries`] and
/// [`Clock`].
///
/// All the functions have a `&self` parameter, so that the methods can access
/// some (possibly internally mutable) state, but still keeping the platform
/// object as widely usable as possible (a "platform" is about as global an
/// object as you get). Also, none of these functions are (supposed to be)
/// hot, and this trait is object safe, so using `&dyn Platform` should be
/// fine performance-wise, and will hopefully help with compilation times by
/// avoiding generics.
pub trait Platform: Clock + FileSystem + Threading + Sockets + DynamicLibraries {
    /// Print out a line of text. This is the one logging primitive every
    /// higher-level logging helper (including [`PlatformLogger`]) funnels
    /// into, so a backend only ever needs to wire up one sink.
    fn log(&self, message: &str);

    /// Best-effort describes an error in the platform's native error space.
    ///
    /// Returns None when the error has no native code (errors tagged by kind
    /// only are never describable) or when the native formatter has nothing
    /// to say about the code. The returned text is purely diagnostic; it is
    /// not stable across platforms or locales.
    fn describe_error(&self, error: &PlatformError) -> Option<String>;

    /// Returns the machine-bound key used to obscure small secrets at rest
    /// via [`encrypt`] and [`decrypt`].
    ///
    /// The key must be stable across runs on the same machine, and should
    /// differ between machines. Backends without any usable machine identity
    /// return [`ErrorKind::NotSupported`].
    fn machine_key(&self) -> PlatformResult<[u32; 4]>;

    /// Hands the target (a URL or a file path) to the system's default
    /// opener, e.g. to show a webpage in the user's browser.
    fn start_open(&self, target: &CpStr) -> PlatformResult<()>;

    /// Request the process to exit, with `clean: false` if intending to
    /// signal failure. On a clean exit, the exit may be delayed until a
    /// moment later, e.g. after resource clean up. In failure cases, the
    /// idea is to bail asap, but it's up to the platform.
    fn exit(&self, clean: bool) -> !;

    /// Reports an unrecoverable failure and terminates the process without
    /// unwinding.
    ///
    /// This is the channel for failures which indicate an unusable runtime
    /// environment (a mutex that cannot be locked, an allocation size that
    /// cannot be computed): they are never surfaced as result codes, since
    /// no caller can meaningfully continue past them. `place` names the
    /// operation that failed.
    fn fatal(&self, place: &str, error: PlatformError) -> !;
}
