//! Structural and type verification of function bodies.
//!
//! The walk visits blocks in storage order and instructions in sequence. Each
//! instruction first has its position in the block checked, then the rule for
//! its kind runs. Nothing is mutated.

use tracing::{debug, instrument, trace};

use crate::{
    config::VerifierConfig,
    ir::{Function, Module},
    types::SignatureProvider,
};

pub mod errors;
pub mod report;
mod rules;

pub use errors::{BlockDefect, Invariant, Location, ShapeDefect, VerificationFailure};
pub use report::VerificationReport;
use rules::InstChecker;

/// Verifies `function`, stopping at the first failure.
pub fn verify<P>(provider: &P, function: &Function<P::Ty>) -> Result<(), VerificationFailure>
where
    P: SignatureProvider,
{
    verify_with(provider, function, &VerifierConfig::default()).into_result()
}

/// Verifies `function`, recording failures according to `config`.
pub fn verify_with<P>(
    provider: &P,
    function: &Function<P::Ty>,
    config: &VerifierConfig,
) -> VerificationReport
where
    P: SignatureProvider,
{
    Verifier::new(provider, function).run(config)
}

/// Verifies every function of `module` in order.
pub fn verify_module<P>(
    provider: &P,
    module: &Module<P::Ty>,
    config: &VerifierConfig,
) -> VerificationReport
where
    P: SignatureProvider,
{
    let limit = config.failure_limit();
    let mut report = VerificationReport::default();

    for function in &module.functions {
        report.extend_with_limit(verify_with(provider, function, config), limit);
        if report.is_full(limit) {
            break;
        }
    }

    report
}

/// Panics with the failure description if `function` does not verify.
#[track_caller]
pub fn assert_verified<P>(provider: &P, function: &Function<P::Ty>)
where
    P: SignatureProvider,
{
    if let Err(failure) = verify(provider, function) {
        panic!("IR verification failed: {failure}");
    }
}

/// Walks one function.
pub struct Verifier<'a, P: SignatureProvider> {
    provider: &'a P,
    function: &'a Function<P::Ty>,
}

impl<'a, P: SignatureProvider> Verifier<'a, P> {
    pub fn new(provider: &'a P, function: &'a Function<P::Ty>) -> Self {
        Self { provider, function }
    }

    #[instrument(level = "debug", skip_all, fields(function = %self.function.name))]
    pub fn run(&self, config: &VerifierConfig) -> VerificationReport {
        let limit = config.failure_limit();
        let mut report = VerificationReport::default();

        if self.function.basic_blocks.is_empty() {
            record(
                &mut report,
                VerificationFailure::EmptyFunction {
                    function: self.function.name.clone(),
                },
                limit,
            );
            return report;
        }

        'blocks: for (block_idx, block) in self.function.basic_blocks.iter().enumerate() {
            if block.instructions.is_empty() {
                let failure = VerificationFailure::MalformedBlock {
                    location: Location {
                        function: self.function.name.clone(),
                        block: block_idx,
                        instruction: None,
                    },
                    defect: BlockDefect::EmptyBlock,
                };
                if !record(&mut report, failure, limit) {
                    break;
                }
                continue;
            }

            let last = block.instructions.len() - 1;
            for (inst_idx, inst) in block.instructions.iter().enumerate() {
                trace!(block = block_idx, index = inst_idx, "verifying `{inst}`");

                let checker = InstChecker {
                    provider: self.provider,
                    function: self.function,
                    block: block_idx,
                    index: inst_idx,
                    inst,
                    is_last: inst_idx == last,
                };

                // The rest of the block can't be trusted once its shape is wrong.
                if let Err(failure) = checker.check_position() {
                    if !record(&mut report, failure, limit) {
                        break 'blocks;
                    }
                    continue 'blocks;
                }

                if let Err(failure) = checker.check() {
                    let fatal = failure.is_fatal();
                    if !record(&mut report, failure, limit) || fatal {
                        break 'blocks;
                    }
                }
            }
        }

        report
    }
}

/// Returns whether the walk should go on.
fn record(report: &mut VerificationReport, failure: VerificationFailure, limit: usize) -> bool {
    debug!("verification failed: {failure}");
    report.push(failure, limit) && !report.is_full(limit)
}
