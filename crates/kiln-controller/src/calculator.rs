//! The per-site stochastic reaction rule.
//!
//! For a center site the calculator enumerates one interaction per
//! neighbour plus one per open (atmospheric) species that can react with
//! it, scores them, samples one, and if it is not the identity commits a
//! reaction stochastically at each participating site.
//!
//! Ledger entries are recorded in absolute volume (nominal volume times
//! the volume multiplier), so for a volume-balanced reaction set
//! `grid + melted + evolved - consumed` is unchanged by every tick.

use indexmap::IndexMap;
use kiln_catalog::{Reaction, ReactionSet};
use kiln_core::{choose_weighted, SimError, SimulationState, SiteId, SiteState, StateDiff};
use kiln_space::NeighborGraph;
use rand::{Rng, RngCore};
use std::sync::Arc;

/// What one candidate interaction would do.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionKind<'a> {
    /// Nothing happens.
    Identity,
    /// React the center with a neighbouring site.
    Neighbor {
        /// The neighbouring site.
        site: SiteId,
        /// Candidate reactions, most competitive first.
        reactions: Vec<&'a Reaction>,
    },
    /// React the center with an atmospheric species.
    Open {
        /// The species name.
        species: &'a str,
        /// Candidate reactions, most competitive first.
        reactions: Vec<&'a Reaction>,
    },
}

/// A scored candidate interaction at one site.
#[derive(Clone, Debug, PartialEq)]
pub struct Interaction<'a> {
    /// Unnormalized selection weight.
    pub score: f64,
    /// What the interaction does.
    pub kind: InteractionKind<'a>,
}

/// Per-site reaction rule over a neighbour graph.
pub struct ReactionCalculator {
    graph: Arc<dyn NeighborGraph>,
    reactions: Option<Arc<ReactionSet>>,
    inertia: f64,
    open_species: IndexMap<String, f64>,
    free_species: Vec<String>,
}

/// Builder for [`ReactionCalculator`].
///
/// Required field: `graph`.
pub struct ReactionCalculatorBuilder {
    graph: Option<Arc<dyn NeighborGraph>>,
    reactions: Option<Arc<ReactionSet>>,
    inertia: f64,
    open_species: IndexMap<String, f64>,
    free_species: Vec<String>,
}

impl ReactionCalculator {
    /// Create a new builder.
    pub fn builder() -> ReactionCalculatorBuilder {
        ReactionCalculatorBuilder {
            graph: None,
            reactions: None,
            inertia: 1.0,
            open_species: IndexMap::new(),
            free_species: Vec::new(),
        }
    }

    /// Replace the active reaction set.
    pub fn set_reactions(&mut self, reactions: Arc<ReactionSet>) {
        self.reactions = Some(reactions);
    }

    /// The active reaction set, if one is installed.
    pub fn reactions(&self) -> Option<&Arc<ReactionSet>> {
        self.reactions.as_ref()
    }

    /// Baseline weight of no-op interactions.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    fn active_set(&self) -> Result<&ReactionSet, SimError> {
        self.reactions.as_deref().ok_or_else(|| SimError::Config {
            reason: "no reaction set installed".to_string(),
        })
    }

    fn score(competitiveness: f64, distance: f64) -> f64 {
        competitiveness / distance.powi(3)
    }

    fn non_identity(reactions: &[Reaction]) -> Vec<&Reaction> {
        reactions.iter().filter(|r| !r.is_identity()).collect()
    }

    /// Enumerate the scored interactions available to `site`.
    ///
    /// Returns an empty list for a free-space center. Fails if the center
    /// or any occupied neighbour holds a phase missing from the catalog, or
    /// if the center phase lacks an identity reaction.
    pub fn interactions<'a>(
        &'a self,
        site: SiteId,
        state: &SimulationState,
    ) -> Result<Vec<Interaction<'a>>, SimError> {
        let center = state.try_site(site)?;
        if center.is_free() {
            return Ok(Vec::new());
        }
        let set = self.active_set()?;
        if set.identity_for(&center.phase).is_none() {
            if !set.phases().contains(&center.phase) {
                return Err(SimError::UnknownPhase {
                    phase: center.phase.clone(),
                });
            }
            return Err(SimError::MissingReaction {
                phase: center.phase.clone(),
            });
        }

        let neighbors = self.graph.neighbors(site);
        let mut out = Vec::with_capacity(neighbors.len() + self.open_species.len());
        for &(nb, distance) in neighbors {
            let other = state.try_site(nb)?;
            if !other.is_free() && !set.phases().contains(&other.phase) {
                return Err(SimError::UnknownPhase {
                    phase: other.phase.clone(),
                });
            }
            let candidates = Self::non_identity(set.reactions_between(&center.phase, &other.phase));
            let top = candidates.first().map(|r| r.competitiveness());
            out.push(match top {
                Some(top) => Interaction {
                    score: Self::score(top, distance),
                    kind: InteractionKind::Neighbor {
                        site: nb,
                        reactions: candidates,
                    },
                },
                None => Interaction {
                    score: self.inertia,
                    kind: InteractionKind::Identity,
                },
            });
        }
        for (species, &distance) in &self.open_species {
            let candidates = Self::non_identity(set.reactions_between(&center.phase, species));
            if let Some(top) = candidates.first().map(|r| r.competitiveness()) {
                out.push(Interaction {
                    score: Self::score(top, distance),
                    kind: InteractionKind::Open {
                        species: species.as_str(),
                        reactions: candidates,
                    },
                });
            }
        }
        Ok(out)
    }

    /// Propose one reaction event at `site`.
    pub fn propose_update(
        &self,
        site: SiteId,
        state: &SimulationState,
        rng: &mut dyn RngCore,
    ) -> Result<StateDiff, SimError> {
        let interactions = self.interactions(site, state)?;
        if interactions.is_empty() {
            return Ok(StateDiff::empty());
        }
        let weights: Vec<f64> = interactions.iter().map(|i| i.score).collect();
        let chosen = choose_weighted(&weights, rng.gen::<f64>()).ok_or_else(|| {
            SimError::DegenerateWeights {
                context: format!("an interaction at site {site}"),
            }
        })?;

        let (partner, reactions) = match &interactions[chosen].kind {
            InteractionKind::Identity => return Ok(StateDiff::empty()),
            InteractionKind::Neighbor { site, reactions } => (Some(*site), reactions),
            InteractionKind::Open { reactions, .. } => (None, reactions),
        };
        let scores: Vec<f64> = reactions.iter().map(|r| r.competitiveness()).collect();
        let rxn = choose_weighted(&scores, rng.gen::<f64>())
            .map(|i| reactions[i])
            .ok_or_else(|| SimError::DegenerateWeights {
                context: format!("a reaction at site {site}"),
            })?;

        let set = self.active_set()?;
        let phases = set.phases();
        let mult = state.general.vol_multiplier;
        let mut diff = StateDiff::empty();
        let mut evolved = state.general.gases_evolved.clone();
        let mut consumed = state.general.gases_consumed.clone();
        let mut ledgers_touched = false;

        for participant in std::iter::once(site).chain(partner) {
            let current = state.try_site(participant)?;
            // Saturates: any probability >= 1 always succeeds.
            let p = rxn.solid_reactant_stoich_fraction(&current.phase) / current.volume;
            if rng.gen::<f64>() >= p {
                continue;
            }

            let extent = current.volume / rxn.total_solid_reactant_stoich();
            for (gas, coeff) in rxn.reactants().iter().filter(|(g, _)| phases.is_gas(g)) {
                *consumed.entry(gas.clone()).or_insert(0.0) += extent * coeff * mult;
                ledgers_touched = true;
            }

            let product = choose_product(rxn, rng.gen::<f64>()).ok_or_else(|| {
                SimError::DegenerateWeights {
                    context: format!("a product of {rxn}"),
                }
            })?;
            let product_volume = extent * rxn.total_product_stoich();
            if phases.is_gas(product) || self.free_species.iter().any(|f| f == product) {
                *evolved.entry(product.to_string()).or_insert(0.0) += product_volume * mult;
                ledgers_touched = true;
                diff.set_site(participant, SiteState::free());
            } else {
                diff.set_site(participant, SiteState::new(product, product_volume));
            }
        }

        if ledgers_touched {
            if evolved != state.general.gases_evolved {
                diff.general.gases_evolved = Some(evolved);
            }
            if consumed != state.general.gases_consumed {
                diff.general.gases_consumed = Some(consumed);
            }
        }
        Ok(diff)
    }
}

fn choose_product(rxn: &Reaction, u: f64) -> Option<&str> {
    let weights: Vec<f64> = rxn.products().values().copied().collect();
    choose_weighted(&weights, u)
        .and_then(|i| rxn.products().get_index(i))
        .map(|(p, _)| p.as_str())
}

impl ReactionCalculatorBuilder {
    /// Set the neighbour graph.
    pub fn graph(mut self, graph: Arc<dyn NeighborGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Set the initial reaction set. Can be installed later with
    /// [`ReactionCalculator::set_reactions`].
    pub fn reactions(mut self, reactions: Arc<ReactionSet>) -> Self {
        self.reactions = Some(reactions);
        self
    }

    /// Weight of no-op interactions (default: 1.0). Must be >= 0.
    pub fn inertia(mut self, inertia: f64) -> Self {
        self.inertia = inertia;
        self
    }

    /// Add an atmospheric species at an effective distance. Must be > 0.
    pub fn open_species(mut self, species: impl Into<String>, distance: f64) -> Self {
        self.open_species.insert(species.into(), distance);
        self
    }

    /// Add a species that leaves the grid when produced.
    pub fn free_species(mut self, species: impl Into<String>) -> Self {
        self.free_species.push(species.into());
        self
    }

    /// Build the calculator, validating all configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - `graph` is not set
    /// - `inertia` is negative or NaN
    /// - an open species distance is not finite and positive
    pub fn build(self) -> Result<ReactionCalculator, String> {
        let graph = self.graph.ok_or_else(|| "graph is required".to_string())?;
        if !self.inertia.is_finite() || self.inertia < 0.0 {
            return Err(format!("inertia must be finite and >= 0, got {}", self.inertia));
        }
        if let Some((s, d)) = self
            .open_species
            .iter()
            .find(|(_, d)| !(d.is_finite() && **d > 0.0))
        {
            return Err(format!("open species '{s}' needs a positive distance, got {d}"));
        }
        Ok(ReactionCalculator {
            graph,
            reactions: self.reactions,
            inertia: self.inertia,
            open_species: self.open_species,
            free_species: self.free_species,
        })
    }
}
