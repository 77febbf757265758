//! The pricing-engine abstraction and the top-level entry point.

use std::fmt;

use ol_core::{errors::Result, Real, Time};
use ol_instruments::{
    MarketParameters, Method, OptionContract, OptionType, Payoff, PricingResult, ResultStatus,
};
use ol_methods::BlackScholesProcess;
use tracing::{debug, warn};

use crate::analytic::{black_scholes::black_scholes_price, AnalyticEngine};
use crate::config::EngineConfig;
use crate::fd_engine::FiniteDifferenceEngine;
use crate::lattice_engine::LatticeEngine;
use crate::mc_engine::MonteCarloEngine;
use crate::registry::ensure_supported;

/// A numerical method that prices option contracts.
///
/// Engines are stateless across calls: everything they build lives for the
/// duration of one [`calculate`](PricingEngine::calculate).
pub trait PricingEngine: fmt::Debug + Send + Sync {
    /// The method this engine implements.
    fn method(&self) -> Method;

    /// Price `contract` under `market`.
    fn calculate(
        &self,
        contract: &OptionContract,
        market: &MarketParameters,
    ) -> Result<PricingResult>;
}

/// Checks shared by every engine: the pair is supported and the contract is
/// consistent with the market. Returns the process the engine simulates.
pub(crate) fn prepare(
    method: Method,
    contract: &OptionContract,
    market: &MarketParameters,
) -> Result<BlackScholesProcess> {
    ensure_supported(contract.kind(), method)?;
    contract.validate(market)?;
    Ok(BlackScholesProcess::from_market(market))
}

/// Terminal payoff of a state-free family.
///
/// Fails with `InvalidParameter` for path-dependent and multi-asset payoffs,
/// which have no value as a function of the terminal spot alone.
pub(crate) fn terminal(
    payoff: &Payoff,
    right: OptionType,
) -> Result<impl Fn(Real) -> Real + '_> {
    ol_core::ensure!(
        payoff.is_terminal(),
        "{payoff:?} has no payoff on the terminal spot alone"
    );
    // `value_at` is `Some` for every terminal family.
    Ok(move |s| payoff.value_at(right, s).unwrap_or(0.0))
}

/// Value of shouting with `remaining` years to run: the locked-in intrinsic
/// paid at maturity plus a fresh at-the-money option.
pub(crate) fn shout_value(
    process: &BlackScholesProcess,
    right: OptionType,
    strike: Real,
    remaining: Time,
    spot: Real,
) -> Real {
    let locked = right.sign() * (spot - strike);
    if locked <= 0.0 {
        return 0.0;
    }
    let remaining = remaining.max(0.0);
    process.discount(remaining) * locked
        + black_scholes_price(&process.with_spot(spot), right, spot, remaining)
}

/// The engine selected by `config`.
pub fn engine_for(config: &EngineConfig) -> Box<dyn PricingEngine> {
    match config {
        EngineConfig::Analytic => Box::new(AnalyticEngine),
        EngineConfig::Lattice(c) => Box::new(LatticeEngine::new(c.clone())),
        EngineConfig::FiniteDifference(c) => Box::new(FiniteDifferenceEngine::new(c.clone())),
        EngineConfig::MonteCarlo(c) => Box::new(MonteCarloEngine::new(c.clone())),
    }
}

/// Price `contract` under `market` with the method and settings in
/// `config`.
///
/// Fails fast with `UnsupportedCombination` for a pair outside the support
/// matrix and with `InvalidParameter` for invalid inputs or settings. A run
/// cut short by a deadline, a cancellation or the path cap returns its best
/// estimate flagged as partial.
pub fn price(
    contract: &OptionContract,
    market: &MarketParameters,
    config: &EngineConfig,
) -> Result<PricingResult> {
    let method = config.method();
    let kind = contract.kind();
    debug!(%kind, %method, ?config, "pricing");
    ensure_supported(kind, method)?;
    config.validate()?;

    let result = engine_for(config).calculate(contract, market)?;
    if let ResultStatus::Partial(reason) = result.status {
        warn!(%kind, %method, ?reason, price = result.price, "returning a partial estimate");
    }
    debug!(
        %kind,
        %method,
        price = result.price,
        std_error = ?result.standard_error,
        diagnostics = ?result.diagnostics,
        "priced"
    );
    Ok(result)
}
