//! Capability registry.
//!
//! A static table of the `(option kind, method)` pairs that have an
//! implementation. Every engine consults it before touching the contract, so
//! an unsupported pair fails fast with `UnsupportedCombination`.

use ol_core::errors::{Error, Result};
use ol_instruments::{Method, OptionKind};

/// One row of the support matrix: analytic, lattice, finite difference,
/// Monte Carlo.
type Row = (OptionKind, [bool; 4]);

const Y: bool = true;
const N: bool = false;

/// The support matrix, in `Method::ALL` column order.
pub const SUPPORT: [Row; 19] = [
    (OptionKind::European, [Y, Y, Y, Y]),
    (OptionKind::American, [Y, Y, N, Y]),
    (OptionKind::Bermudan, [N, Y, Y, Y]),
    (OptionKind::PerpetualAmerican, [Y, N, N, N]),
    (OptionKind::Asian, [Y, Y, N, Y]),
    (OptionKind::Barrier, [Y, Y, Y, Y]),
    (OptionKind::Basket, [Y, N, N, Y]),
    (OptionKind::Binary, [Y, Y, Y, Y]),
    (OptionKind::Chooser, [Y, Y, Y, Y]),
    (OptionKind::Compound, [Y, Y, Y, Y]),
    (OptionKind::Exchange, [Y, Y, Y, Y]),
    (OptionKind::ForwardStart, [Y, Y, N, Y]),
    (OptionKind::Gap, [Y, Y, Y, Y]),
    (OptionKind::Lookback, [Y, Y, N, Y]),
    (OptionKind::Quanto, [Y, Y, Y, Y]),
    (OptionKind::Rainbow, [Y, N, N, Y]),
    (OptionKind::Shout, [N, Y, Y, N]),
    (OptionKind::Spread, [Y, N, N, Y]),
    (OptionKind::VarianceSwap, [Y, N, N, N]),
];

fn column(method: Method) -> usize {
    match method {
        Method::Analytic => 0,
        Method::Lattice => 1,
        Method::FiniteDifference => 2,
        Method::MonteCarlo => 3,
    }
}

/// Whether `kind` can be priced with `method`.
pub fn is_supported(kind: OptionKind, method: Method) -> bool {
    SUPPORT
        .iter()
        .find(|(k, _)| *k == kind)
        .is_some_and(|(_, row)| row[column(method)])
}

/// `Ok(())` for a supported pair, `UnsupportedCombination` otherwise.
pub fn ensure_supported(kind: OptionKind, method: Method) -> Result<()> {
    if is_supported(kind, method) {
        Ok(())
    } else {
        Err(Error::UnsupportedCombination {
            kind: kind.name().into(),
            method: method.name().into(),
        })
    }
}

/// Methods available for `kind`, in `Method::ALL` order.
pub fn methods_for(kind: OptionKind) -> Vec<Method> {
    Method::ALL
        .into_iter()
        .filter(|&m| is_supported(kind, m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Expected matrix written out independently of the table above.
    fn expected(kind: OptionKind, method: Method) -> bool {
        use Method::*;
        use OptionKind::*;
        match (kind, method) {
            (European | Barrier | Binary | Chooser | Compound | Exchange | Gap | Quanto, _) => true,
            (American, m) => m != FiniteDifference,
            (Bermudan, m) => m != Analytic,
            (PerpetualAmerican, m) => m == Analytic,
            (Asian | ForwardStart | Lookback, m) => m != FiniteDifference,
            (Basket | Rainbow | Spread, m) => matches!(m, Analytic | MonteCarlo),
            (Shout, m) => matches!(m, Lattice | FiniteDifference),
            (VarianceSwap, m) => m == Analytic,
        }
    }

    #[test]
    fn table_matches_support_matrix_exhaustively() {
        let mut checked = 0;
        for kind in OptionKind::ALL {
            for method in Method::ALL {
                assert_eq!(
                    is_supported(kind, method),
                    expected(kind, method),
                    "{kind} / {method}"
                );
                checked += 1;
            }
        }
        assert_eq!(checked, 76);
    }

    #[test]
    fn every_kind_has_a_row_and_a_method() {
        for kind in OptionKind::ALL {
            assert_eq!(SUPPORT.iter().filter(|(k, _)| *k == kind).count(), 1);
            assert!(!methods_for(kind).is_empty(), "{kind}");
        }
    }

    #[test]
    fn variance_swap_by_finite_difference_is_rejected() {
        match ensure_supported(OptionKind::VarianceSwap, Method::FiniteDifference) {
            Err(Error::UnsupportedCombination { kind, method }) => {
                assert_eq!(kind, "VarianceSwap");
                assert_eq!(method, "FiniteDifference");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(ensure_supported(OptionKind::European, Method::FiniteDifference).is_ok());
    }

    proptest! {
        #[test]
        fn ensure_agrees_with_query(k in 0usize..19, m in 0usize..4) {
            let (kind, method) = (OptionKind::ALL[k], Method::ALL[m]);
            prop_assert_eq!(ensure_supported(kind, method).is_ok(), is_supported(kind, method));
        }
    }
}
