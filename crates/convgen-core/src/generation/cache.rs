//! Signature cache and fallibility fixpoint
//!
//! The cache is owned by one generation run and threaded through both
//! passes by exclusive reference. Pass 1 records, per signature, whether a
//! field fails on its own and which other signatures it delegates to.
//! [`SignatureCache::stabilize`] closes that relation into an immutable
//! [`FallibilitySnapshot`], which pass 2 reads but never writes.

use std::collections::{BTreeMap, BTreeSet};

use crate::generation::plan::{MapperSignature, SignatureRecord};

/// Whether a signature can fail, and the first field path that makes it so
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fallibility {
    pub fallible: bool,
    pub culprit: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct CacheEntry {
    direct: Fallibility,
    references: usize,
    origin: String,
    /// (delegate, field) edges in sorted order
    delegates: BTreeSet<(MapperSignature, String)>,
}

/// Deduplicated signatures of one run
#[derive(Debug, Clone, Default)]
pub struct SignatureCache {
    entries: BTreeMap<MapperSignature, CacheEntry>,
}

impl SignatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one use of `signature`, returning true on first sight
    pub fn register(&mut self, signature: &MapperSignature, origin: &str) -> bool {
        let mut created = false;
        let entry = self.entries.entry(signature.clone()).or_insert_with(|| {
            created = true;
            CacheEntry {
                origin: origin.to_string(),
                ..CacheEntry::default()
            }
        });
        entry.references += 1;
        created
    }

    /// `field` of `signature` fails without help from other signatures
    pub fn mark_fallible(&mut self, signature: &MapperSignature, field: &str) {
        if let Some(entry) = self.entries.get_mut(signature) {
            if !entry.direct.fallible {
                entry.direct = Fallibility {
                    fallible: true,
                    culprit: Some(field.to_string()),
                };
            }
        }
    }

    /// `field` of `signature` delegates to `delegate`
    pub fn depend(&mut self, signature: &MapperSignature, delegate: &MapperSignature, field: &str) {
        if let Some(entry) = self.entries.get_mut(signature) {
            entry
                .delegates
                .insert((delegate.clone(), field.to_string()));
        }
    }

    pub fn references(&self, signature: &MapperSignature) -> usize {
        self.entries.get(signature).map_or(0, |e| e.references)
    }

    /// Interface method that first reached `signature`
    pub fn origin(&self, signature: &MapperSignature) -> Option<&str> {
        self.entries.get(signature).map(|e| e.origin.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fallibility exactly as recorded, without following delegation
    pub fn direct(&self) -> FallibilitySnapshot {
        self.entries
            .iter()
            .map(|(sig, entry)| (sig.clone(), entry.direct.clone()))
            .collect()
    }

    /// Close direct fallibility over delegation edges.
    ///
    /// Each round can only flip entries from non-fallible to fallible, so
    /// the loop ends after at most one round per entry.
    pub fn stabilize(&self) -> FallibilitySnapshot {
        let mut state: BTreeMap<MapperSignature, Fallibility> = self
            .entries
            .iter()
            .map(|(sig, entry)| (sig.clone(), entry.direct.clone()))
            .collect();

        loop {
            let mut flips = Vec::new();
            for (sig, entry) in &self.entries {
                if state.get(sig).is_some_and(|f| f.fallible) {
                    continue;
                }
                let culprit = entry.delegates.iter().find_map(|(delegate, field)| {
                    state
                        .get(delegate)
                        .filter(|f| f.fallible)
                        .map(|f| match &f.culprit {
                            Some(inner) => format!("{}.{}", field, inner),
                            None => field.clone(),
                        })
                });
                if let Some(culprit) = culprit {
                    flips.push((sig.clone(), culprit));
                }
            }
            if flips.is_empty() {
                break;
            }
            for (sig, culprit) in flips {
                state.insert(
                    sig,
                    Fallibility {
                        fallible: true,
                        culprit: Some(culprit),
                    },
                );
            }
        }

        FallibilitySnapshot { entries: state }
    }

    /// Report entries using fallibility from `snapshot`
    pub fn records(&self, snapshot: &FallibilitySnapshot) -> Vec<SignatureRecord> {
        self.entries
            .iter()
            .map(|(sig, entry)| {
                let fallibility = snapshot.get(sig);
                SignatureRecord {
                    signature: sig.clone(),
                    fallible: fallibility.fallible,
                    culprit: fallibility.culprit,
                    references: entry.references,
                }
            })
            .collect()
    }
}

/// Frozen per-signature fallibility
///
/// Unknown signatures are treated as non-fallible, which is what pass 1
/// assumes before anything has been recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallibilitySnapshot {
    entries: BTreeMap<MapperSignature, Fallibility>,
}

impl FallibilitySnapshot {
    /// Snapshot with nothing known yet
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_fallible(&self, signature: &MapperSignature) -> bool {
        self.entries.get(signature).is_some_and(|f| f.fallible)
    }

    pub fn culprit(&self, signature: &MapperSignature) -> Option<&str> {
        self.entries
            .get(signature)
            .and_then(|f| f.culprit.as_deref())
    }

    pub fn get(&self, signature: &MapperSignature) -> Fallibility {
        self.entries.get(signature).cloned().unwrap_or_default()
    }

    pub fn fallible_signatures(&self) -> impl Iterator<Item = &MapperSignature> {
        self.entries
            .iter()
            .filter(|(_, f)| f.fallible)
            .map(|(sig, _)| sig)
    }

    /// Every signature fallible here is fallible in `other`
    pub fn is_subset_of(&self, other: &FallibilitySnapshot) -> bool {
        self.fallible_signatures().all(|sig| other.is_fallible(sig))
    }
}

impl FromIterator<(MapperSignature, Fallibility)> for FallibilitySnapshot {
    fn from_iter<I: IntoIterator<Item = (MapperSignature, Fallibility)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
