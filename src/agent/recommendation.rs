//! Recommendation stage: samples curated options from static pools.
//!
//! Selection is random and data-independent. Every sampled string is a
//! member of its pool and no pool entry is drawn twice.

use super::{Agent, AgentCore};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const EMISSION_REDUCTION_SAMPLES: usize = 7;
pub const POLICY_SAMPLES: usize = 5;
pub const TECHNOLOGY_SAMPLES: usize = 6;
pub const STRATEGIC_SAMPLES: usize = 5;

/// Option pools per recommendation category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPools {
    pub emission_reduction: Vec<String>,
    pub policy_suggestions: Vec<String>,
    pub technology_investments: Vec<String>,
    pub short_term: Vec<String>,
    pub medium_term: Vec<String>,
    pub long_term: Vec<String>,
}

fn pool(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RecommendationPools {
    fn default() -> Self {
        Self {
            emission_reduction: pool(&[
                "Implement energy efficiency projects",
                "Increase the use of renewable energy sources",
                "Evaluate carbon capture and storage technologies",
                "Optimize production processes",
                "Improve waste management and recycling systems",
                "Use energy-saving equipment",
                "Install heat recovery systems",
                "Improve building insulation",
                "Switch to low-carbon fuels",
                "Train employees in energy saving",
                "Set up carbon footprint monitoring and reporting",
                "Cut logistics emissions through supply chain optimization",
            ]),
            policy_suggestions: pool(&[
                "Introduce stricter regulation in emission-intensive regions",
                "Expand incentives for low-carbon production",
                "Implement carbon pricing mechanisms",
                "Develop green certification programmes",
                "Raise energy efficiency standards",
                "Offer tax reductions for renewable energy use",
                "Encourage industrial symbiosis projects",
                "Make sustainability reporting mandatory",
                "Promote circular economy principles",
                "Widen access to green finance",
                "Set carbon-neutral targets",
                "Set sector-level emission reduction targets",
            ]),
            technology_investments: pool(&[
                "Invest in energy-efficient production technologies",
                "Install renewable energy systems",
                "Deploy digital monitoring and optimization systems",
                "AI-assisted energy management systems",
                "IoT sensor networks",
                "Smart factory systems",
                "Blockchain-based supply chain tracking",
                "Carbon capture technologies",
                "Use of bio-based materials",
                "Hydrogen and fuel cell technologies",
                "Energy storage systems",
                "Transition to an electric vehicle fleet",
            ]),
            short_term: pool(&[
                "Carry out energy efficiency audits",
                "Install emission monitoring systems",
                "Run sustainability training for employees",
                "Optimize energy consumption",
                "Launch waste reduction programmes",
                "Add sustainability criteria to supplier assessments",
                "Develop a carbon footprint methodology",
                "Define sustainability targets",
                "Start energy saving campaigns",
                "Establish internal carbon pricing",
            ]),
            medium_term: pool(&[
                "Replace equipment with energy-efficient models",
                "Make renewable energy investments",
                "Launch supply chain optimization projects",
                "Move to sustainable product design",
                "Build carbon-neutral pilot facilities",
                "Develop industrial symbiosis projects",
                "Deliver digital transformation projects",
                "Develop sustainable raw material sourcing",
                "Perform product life-cycle assessments",
                "Obtain green building certification",
            ]),
            long_term: pool(&[
                "Set carbon-neutral production targets",
                "Adopt circular economy models",
                "Develop industrial symbiosis projects",
                "Fully integrated sustainability management systems",
                "Develop innovative low-carbon technologies",
                "Complete the move to sustainable business models",
                "Fully decarbonize the supply chain",
                "Build industrial ecosystems",
                "Convert to zero-waste facilities",
                "Apply carbon-negative technologies",
            ]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategicRecommendations {
    pub short_term: Vec<String>,
    pub medium_term: Vec<String>,
    pub long_term: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub emission_reduction: Vec<String>,
    pub policy_suggestions: Vec<String>,
    pub technology_investments: Vec<String>,
    pub strategic_recommendations: StrategicRecommendations,
}

impl Recommendations {
    pub fn total(&self) -> usize {
        self.emission_reduction.len()
            + self.policy_suggestions.len()
            + self.technology_investments.len()
            + self.strategic_recommendations.short_term.len()
            + self.strategic_recommendations.medium_term.len()
            + self.strategic_recommendations.long_term.len()
    }
}

pub struct RecommendationAgent {
    core: AgentCore,
    pools: RecommendationPools,
    rng: StdRng,
}

impl RecommendationAgent {
    pub fn new(pools: RecommendationPools, rng: StdRng) -> Self {
        Self {
            core: AgentCore::new("Recommender"),
            pools,
            rng,
        }
    }

    pub fn pools(&self) -> &RecommendationPools {
        &self.pools
    }

    fn sample(&mut self, which: fn(&RecommendationPools) -> &Vec<String>, k: usize) -> Vec<String> {
        which(&self.pools)
            .choose_multiple(&mut self.rng, k)
            .cloned()
            .collect()
    }
}

impl Agent for RecommendationAgent {
    type Input = ();
    type Output = Recommendations;

    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn process(&mut self, _input: &()) -> Recommendations {
        let recommendations = Recommendations {
            emission_reduction: self.sample(|p| &p.emission_reduction, EMISSION_REDUCTION_SAMPLES),
            policy_suggestions: self.sample(|p| &p.policy_suggestions, POLICY_SAMPLES),
            technology_investments: self.sample(|p| &p.technology_investments, TECHNOLOGY_SAMPLES),
            strategic_recommendations: StrategicRecommendations {
                short_term: self.sample(|p| &p.short_term, STRATEGIC_SAMPLES),
                medium_term: self.sample(|p| &p.medium_term, STRATEGIC_SAMPLES),
                long_term: self.sample(|p| &p.long_term, STRATEGIC_SAMPLES),
            },
        };

        info!("Selected {} recommendations", recommendations.total());
        self.remember("recommendations", &recommendations);
        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn agent(seed: u64) -> RecommendationAgent {
        RecommendationAgent::new(RecommendationPools::default(), StdRng::seed_from_u64(seed))
    }

    fn assert_subset(sampled: &[String], pool: &[String], expected_len: usize) {
        assert_eq!(sampled.len(), expected_len);
        let unique: HashSet<_> = sampled.iter().collect();
        assert_eq!(unique.len(), sampled.len(), "duplicates in {:?}", sampled);
        for item in sampled {
            assert!(pool.contains(item), "{} not in pool", item);
        }
    }

    #[test]
    fn test_sizes_and_membership() {
        let pools = RecommendationPools::default();
        for seed in 0..20 {
            let r = agent(seed).process(&());
            assert_subset(&r.emission_reduction, &pools.emission_reduction, 7);
            assert_subset(&r.policy_suggestions, &pools.policy_suggestions, 5);
            assert_subset(&r.technology_investments, &pools.technology_investments, 6);
            assert_subset(&r.strategic_recommendations.short_term, &pools.short_term, 5);
            assert_subset(&r.strategic_recommendations.medium_term, &pools.medium_term, 5);
            assert_subset(&r.strategic_recommendations.long_term, &pools.long_term, 5);
        }
    }

    #[test]
    fn test_small_pool_yields_whole_pool() {
        let pools = RecommendationPools {
            emission_reduction: pool(&["only", "two"]),
            ..RecommendationPools::default()
        };
        let mut agent = RecommendationAgent::new(pools, StdRng::seed_from_u64(1));
        let r = agent.process(&());

        let got: HashSet<_> = r.emission_reduction.iter().map(String::as_str).collect();
        assert_eq!(got, HashSet::from(["only", "two"]));
    }

    #[test]
    fn test_empty_pool() {
        let pools = RecommendationPools {
            long_term: Vec::new(),
            ..RecommendationPools::default()
        };
        let mut agent = RecommendationAgent::new(pools, StdRng::seed_from_u64(1));
        assert!(agent.process(&()).strategic_recommendations.long_term.is_empty());
    }

    #[test]
    fn test_same_seed_same_selection() {
        assert_eq!(agent(99).process(&()), agent(99).process(&()));
    }

    #[test]
    fn test_records_recommendations() {
        let mut agent = agent(3);
        agent.process(&());
        assert!(agent.get_knowledge("recommendations").is_some());
    }
}
