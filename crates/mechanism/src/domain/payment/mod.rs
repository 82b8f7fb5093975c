use {
    super::evaluator::Evaluation,
    derive_more::{From, Into},
    serde::{Deserialize, Serialize},
    std::fmt::{self, Display, Formatter},
};

pub mod core_selecting;
pub mod llg;
pub mod vcg;

/// Selects how winners pay and which evaluator values the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentRule {
    Vcg,
    /// Core-selecting payments nearest to VCG.
    Core,
    /// Closed form core payments for local-local-global auctions.
    LlgCore,
    /// VCG conditioned on the realized availability.
    EccVcg,
    EccCore,
    /// VCG with expected values and realized per-good costs.
    EcrVcg,
    EcrCore,
    /// VCG in expectation over the availability model.
    ExpVcg,
    ExpCore,
    /// LLG closed form under the realized availability.
    EccLlgCore,
    EcrLlgCore,
    ExpLlgCore,
}

impl PaymentRule {
    pub const ALL: [PaymentRule; 12] = [
        PaymentRule::Vcg,
        PaymentRule::Core,
        PaymentRule::LlgCore,
        PaymentRule::EccVcg,
        PaymentRule::EccCore,
        PaymentRule::EcrVcg,
        PaymentRule::EcrCore,
        PaymentRule::ExpVcg,
        PaymentRule::ExpCore,
        PaymentRule::EccLlgCore,
        PaymentRule::EcrLlgCore,
        PaymentRule::ExpLlgCore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentRule::Vcg => "vcg",
            PaymentRule::Core => "core",
            PaymentRule::LlgCore => "llg-core",
            PaymentRule::EccVcg => "ecc-vcg",
            PaymentRule::EccCore => "ecc-core",
            PaymentRule::EcrVcg => "ecr-vcg",
            PaymentRule::EcrCore => "ecr-core",
            PaymentRule::ExpVcg => "exp-vcg",
            PaymentRule::ExpCore => "exp-core",
            PaymentRule::EccLlgCore => "ecc-llg-core",
            PaymentRule::EcrLlgCore => "ecr-llg-core",
            PaymentRule::ExpLlgCore => "exp-llg-core",
        }
    }

    pub fn evaluation(self) -> Evaluation {
        match self {
            PaymentRule::Vcg | PaymentRule::Core | PaymentRule::LlgCore => {
                Evaluation::Deterministic
            }
            PaymentRule::EccVcg | PaymentRule::EccCore | PaymentRule::EccLlgCore => {
                Evaluation::Conditioned
            }
            PaymentRule::EcrVcg | PaymentRule::EcrCore | PaymentRule::EcrLlgCore => {
                Evaluation::RealizedReference
            }
            PaymentRule::ExpVcg | PaymentRule::ExpCore | PaymentRule::ExpLlgCore => {
                Evaluation::Expected
            }
        }
    }

    pub fn is_core_selecting(self) -> bool {
        matches!(
            self,
            PaymentRule::Core
                | PaymentRule::EccCore
                | PaymentRule::EcrCore
                | PaymentRule::ExpCore
        ) || self.is_llg()
    }

    /// Rules that use the local-local-global closed form.
    pub fn is_llg(self) -> bool {
        matches!(
            self,
            PaymentRule::LlgCore
                | PaymentRule::EccLlgCore
                | PaymentRule::EcrLlgCore
                | PaymentRule::ExpLlgCore
        )
    }

    pub fn needs_model(self) -> bool {
        !matches!(self.evaluation(), Evaluation::Deterministic)
    }

    pub fn needs_realization(self) -> bool {
        matches!(
            self.evaluation(),
            Evaluation::Conditioned | Evaluation::RealizedReference
        )
    }
}

impl Display for PaymentRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One payment per winner, index aligned with [`super::Allocation::winners`].
#[derive(Debug, Clone, Default, PartialEq, From, Into)]
pub struct PaymentVector(Vec<f64>);

impl PaymentVector {
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.; len])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }
}

/// How a payment computation ended. Empty cores and VCG payments that are
/// already in the core are regular outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Solved(PaymentVector),
    VcgInCore(PaymentVector),
    EmptyCore(EmptyCore),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmptyCore {
    pub reason: EmptyCoreReason,
    /// VCG payments of the same allocation, the usual fallback.
    pub vcg: PaymentVector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyCoreReason {
    /// The generated coalition constraints admit no payment vector.
    Infeasible,
    /// The iteration cap was hit or a coalition was generated twice.
    NotConverged { iterations: usize },
    /// The optimizer ran out of time.
    TimedOut,
}

impl Resolution {
    /// The payments selected by the rule, `None` if the core is empty.
    pub fn payments(&self) -> Option<&PaymentVector> {
        match self {
            Resolution::Solved(payments) | Resolution::VcgInCore(payments) => Some(payments),
            Resolution::EmptyCore(_) => None,
        }
    }

    /// The selected payments, falling back to VCG for empty cores.
    pub fn or_vcg(&self) -> &PaymentVector {
        match self {
            Resolution::Solved(payments) | Resolution::VcgInCore(payments) => payments,
            Resolution::EmptyCore(empty) => &empty.vcg,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Solved(_) => "solved",
            Resolution::VcgInCore(_) => "vcg_in_core",
            Resolution::EmptyCore(_) => "empty_core",
        }
    }
}
