// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]

//! # dotframe
//!
//! The method-invocation engine of a CIL virtual machine. `dotframe` drives, for every
//! logical execution thread, a stack of call frames through an explicit state machine:
//!
//! - **Resolution** - a method token is decoded into a [`metadata::token::TokenKind`] and
//!   resolved to a local method body or, through `MemberRef -> TypeRef -> AssemblyRef`,
//!   to another assembly (possibly waiting on an asynchronous assembly load)
//! - **Activation** - arguments are taken from the tail of the shared operand stack and
//!   promoted into pool-backed storage when their type has a static size; locals are
//!   zero-initialized the same way
//! - **Dispatch** - the frame is handed either to an [`emulation::InstructionExecutor`]
//!   (interpreted body) or to a [`emulation::NativeCall`] (native bridge)
//! - **Teardown** - every value the frame owns is released back to the pool exactly once
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dotframe::prelude::*;
//!
//! # fn run(executor: Arc<dyn InstructionExecutor>) -> dotframe::Result<()> {
//! // A static int32 Add(int32, int32)
//! let assembly = Assembly::builder("App")
//!     .method_def(vec![0x00, 0x02, 0x08, 0x08, 0x08], MethodBodyFlags::empty(), Token::new(0), vec![0x2A])
//!     .build();
//!
//! let domain = Arc::new(AppDomain::new());
//! domain.register(assembly.clone());
//! let context = ExecutionContext::new(domain, executor);
//!
//! let mut thread = Thread::new(ThreadId::MAIN);
//! thread.push(RawValue::I32(2));
//! thread.push(RawValue::I32(3));
//! thread.call(assembly, Token::new(0x0600_0001));
//!
//! while thread.step(&context)? {}
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - tokens, the metadata rows the resolver walks, signatures and assemblies
//! - [`emulation`] - values, the value pool, the application domain, the native bridge
//!   and the thread / call-frame state machine
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Error Handling
//!
//! Every fatal condition of the state machine is an [`emulation::EmulationError`] wrapped
//! in [`Error::Emulation`]:
//!
//! ```rust,no_run
//! use dotframe::{Error, emulation::EmulationError};
//!
//! # fn report(result: dotframe::Result<bool>) {
//! match result {
//!     Ok(more) => println!("thread has more work: {more}"),
//!     Err(Error::Emulation(EmulationError::UnsupportedTokenTable { token, .. })) => {
//!         eprintln!("cannot invoke {token}");
//!     }
//!     Err(e) => eprintln!("fatal: {e}"),
//! }
//! # }
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never installs a
//! logger itself; frame lifecycle events are emitted at `debug`, individual state
//! transitions at `trace`.
#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use dotframe::prelude::*;
///
/// let mut thread = Thread::new(ThreadId::MAIN);
/// thread.push(RawValue::I32(42));
/// ```
pub mod prelude;

/// Metadata model consumed by the invocation engine
///
/// This module provides the parts of ECMA-335 metadata the call-frame state machine
/// needs to resolve a method token:
///
/// - [`metadata::token`] - 32-bit metadata tokens and their decoded kind
/// - [`metadata::tables`] - `MemberRef`, `TypeRef`, `AssemblyRef` and `StandAloneSig` rows
/// - [`metadata::signatures`] - method and local variable signature decoding
/// - [`metadata::method`] - method bodies
/// - [`metadata::assembly`] - loaded assemblies and their optional native bridge
pub mod metadata;

/// Call-frame execution engine
///
/// See [`emulation::Thread::step`] for the centerpiece of the crate.
pub mod emulation;

pub use error::Error;

/// The generic Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

pub use file::parser::Parser;
