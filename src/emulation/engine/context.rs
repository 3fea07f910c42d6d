//! The explicit environment every step runs in.

use std::{fmt, sync::Arc};

use crate::{
    emulation::{
        config::ExecutionConfig, engine::InstructionExecutor, memory::ValuePool,
        runtime::AppDomain,
    },
    metadata::signatures::{EcmaSignatureDecoder, SignatureDecoder},
};

/// Everything [`crate::emulation::Thread::step`] needs besides the thread itself.
///
/// The context is cheap to clone and shared by all threads of a virtual machine
/// instance; it is passed explicitly into every step rather than reached through globals.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use dotframe::prelude::*;
///
/// # fn build(executor: Arc<dyn InstructionExecutor>) {
/// let config = ExecutionConfig::default()
///     .with_limits(ExecutionLimits::default().with_max_call_depth(64));
/// let domain = Arc::new(AppDomain::from_config(&config));
///
/// let context = ExecutionContext::new(domain, executor).with_config(config);
/// assert_eq!(context.config().limits.max_call_depth, 64);
/// # }
/// ```
#[derive(Clone)]
pub struct ExecutionContext {
    /// Assembly registry, pending loads and the value pool
    domain: Arc<AppDomain>,
    /// Interpreter for method bodies
    executor: Arc<dyn InstructionExecutor>,
    /// Signature blob decoder
    decoder: Arc<dyn SignatureDecoder>,
    /// Limits and policies
    config: Arc<ExecutionConfig>,
}

impl ExecutionContext {
    /// Creates a context with the ECMA-335 signature decoder and the default configuration
    #[must_use]
    pub fn new(domain: Arc<AppDomain>, executor: Arc<dyn InstructionExecutor>) -> Self {
        ExecutionContext {
            domain,
            executor,
            decoder: Arc::new(EcmaSignatureDecoder),
            config: Arc::new(ExecutionConfig::default()),
        }
    }

    /// Replaces the signature decoder
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn SignatureDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Replaces the configuration
    #[must_use]
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// The application domain
    #[must_use]
    pub fn domain(&self) -> &Arc<AppDomain> {
        &self.domain
    }

    /// The instruction executor
    #[must_use]
    pub fn executor(&self) -> &Arc<dyn InstructionExecutor> {
        &self.executor
    }

    /// The signature decoder
    #[must_use]
    pub fn decoder(&self) -> &dyn SignatureDecoder {
        self.decoder.as_ref()
    }

    /// The configuration
    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Shortcut for the domain's value pool
    #[must_use]
    pub fn pool(&self) -> &ValuePool {
        self.domain.pool()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("domain", &self.domain)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
