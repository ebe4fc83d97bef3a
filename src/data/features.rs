/// Fixed-size feature vector produced by the signal analysis for one number at one draw
#[derive(Debug, Clone, PartialEq)]
pub struct HitFeatures {
    pub momentum: f64,
    pub gap: f64,
    pub markov: f64,
    pub pattern: f64,
    pub algebraic: f64,
    pub lag1: f64,
    pub lag2: f64,
    /// CSV column `hmmState`
    pub hmm_state: f64,
    pub resonance: f64,
}

impl HitFeatures {
    pub const NUM_FEATURES: usize = 9;

    /// Column names in model input order, as they appear in the CSV header
    pub const NAMES: [&'static str; Self::NUM_FEATURES] = [
        "momentum",
        "gap",
        "markov",
        "pattern",
        "algebraic",
        "lag1",
        "lag2",
        "hmmState",
        "resonance",
    ];

    pub fn to_array(&self) -> [f64; Self::NUM_FEATURES] {
        [
            self.momentum,
            self.gap,
            self.markov,
            self.pattern,
            self.algebraic,
            self.lag1,
            self.lag2,
            self.hmm_state,
            self.resonance,
        ]
    }

    pub fn from_array(values: [f64; Self::NUM_FEATURES]) -> Self {
        let [momentum, gap, markov, pattern, algebraic, lag1, lag2, hmm_state, resonance] = values;
        Self { momentum, gap, markov, pattern, algebraic, lag1, lag2, hmm_state, resonance }
    }
}

/// One historical row: features plus whether the number hit within the next five draws
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub features: HitFeatures,
    pub hit_in_5: bool,
}

impl Observation {
    pub fn new(features: HitFeatures, hit_in_5: bool) -> Self {
        Self { features, hit_in_5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_order_matches_names() {
        let features = HitFeatures::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(features.hmm_state, 8.0);
        assert_eq!(features.to_array()[7], 8.0);
        assert_eq!(HitFeatures::NAMES[7], "hmmState");
        assert_eq!(HitFeatures::NAMES.len(), HitFeatures::NUM_FEATURES);
    }
}
