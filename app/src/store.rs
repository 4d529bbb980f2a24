// ==============================================================================
// store.rs - In-Memory Variant Store
// ==============================================================================
// Description: Identity-keyed store of enriched variants with filtered,
//              insertion-ordered listing and aggregate statistics
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Each call holds the lock for its whole duration and never awaits, so every
// upsert is atomic per identity. Jobs running at the same time still
// interleave their upserts; last write wins per identity.
// ==============================================================================

use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::identity::{normalize_chromosome, VariantIdentity};
use crate::models::{AnnotationSource, EnrichedVariant};

/// Listing filter; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct VariantFilter {
    pub chrom: Option<String>,
    pub min_quality: Option<f64>,
}

impl VariantFilter {
    fn matches(&self, variant: &EnrichedVariant, chrom: Option<&str>) -> bool {
        if let Some(chrom) = chrom {
            if variant.record.chrom != chrom {
                return false;
            }
        }
        if let Some(min) = self.min_quality {
            // No quality never passes a quality threshold
            match variant.record.qual {
                Some(q) if q >= min => {}
                _ => return false,
            }
        }
        true
    }
}

/// Aggregate view over the stored variants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_variants: usize,
    /// "{ref_len}_{alt_len}" → count
    pub variant_types: BTreeMap<String, usize>,
    /// source → share of variants whose entry is annotated (0.0 when empty)
    pub annotation_success_rates: BTreeMap<AnnotationSource, f64>,
}

#[derive(Debug, Default)]
struct StoreInner {
    variants: Vec<EnrichedVariant>,
    index: HashMap<VariantIdentity, usize>,
}

/// Variant store shared by the pipeline and the query layer
#[derive(Debug, Default)]
pub struct VariantStore {
    inner: RwLock<StoreInner>,
}

impl VariantStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or wholesale-replace the variant under its identity
    ///
    /// A replaced variant keeps its listing position and `created_at`.
    pub fn upsert(&self, mut variant: EnrichedVariant) {
        let mut inner = self.write();
        match inner.index.get(&variant.id).copied() {
            Some(pos) => {
                let existing = &mut inner.variants[pos];
                variant.created_at = existing.created_at;
                variant.updated_at = Utc::now();
                *existing = variant;
            }
            None => {
                let pos = inner.variants.len();
                inner.index.insert(variant.id.clone(), pos);
                inner.variants.push(variant);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<EnrichedVariant> {
        let inner = self.read();
        inner.index.get(id).map(|&pos| inner.variants[pos].clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().index.contains_key(id)
    }

    /// Filtered page of variants, in insertion order
    pub fn list(&self, filter: &VariantFilter, limit: usize, offset: usize) -> Vec<EnrichedVariant> {
        let chrom = filter.chrom.as_deref().map(normalize_chromosome);
        self.read()
            .variants
            .iter()
            .filter(|v| filter.matches(v, chrom.as_deref()))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.write();
        inner.variants.clear();
        inner.index.clear();
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.read();
        let total = inner.variants.len();

        let mut variant_types = BTreeMap::new();
        for v in &inner.variants {
            let key = format!("{}_{}", v.record.ref_allele.len(), v.record.alt_allele.len());
            *variant_types.entry(key).or_insert(0) += 1;
        }

        let annotation_success_rates = AnnotationSource::ALL
            .iter()
            .map(|&source| {
                let annotated = inner
                    .variants
                    .iter()
                    .filter(|v| v.annotations.get(source).is_some_and(|e| e.is_annotated()))
                    .count();
                let rate = if total == 0 {
                    0.0
                } else {
                    annotated as f64 / total as f64
                };
                (source, rate)
            })
            .collect();

        StoreStats {
            total_variants: total,
            variant_types,
            annotation_success_rates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnnotationBundle, AnnotationEntry, ConsequenceAnnotation};
    use crate::parsers::parse_line;

    fn variant(line: &str) -> EnrichedVariant {
        EnrichedVariant::new(parse_line(line).unwrap().unwrap(), AnnotationBundle::new())
    }

    fn ids(variants: &[EnrichedVariant]) -> Vec<&str> {
        variants.iter().map(|v| v.id.as_str()).collect()
    }

    fn populated() -> VariantStore {
        let store = VariantStore::new();
        store.upsert(variant("1\t300\t.\tA\tG\t100\tPASS\t."));
        store.upsert(variant("2\t100\t.\tC\tT\t60\tPASS\t."));
        store.upsert(variant("1\t100\t.\tA\tG\t30\tPASS\t."));
        store.upsert(variant("1\t200\t.\tA\tG\t60\tPASS\t."));
        store.upsert(variant("2\t200\t.\tC\tT\t100\tPASS\t."));
        store
    }

    #[test]
    fn test_list_filter_keeps_insertion_order() {
        let store = populated();
        let filter = VariantFilter {
            chrom: Some("1".to_string()),
            min_quality: Some(50.0),
        };

        let listed = store.list(&filter, 100, 0);
        assert_eq!(ids(&listed), vec!["1_300_A_G", "1_200_A_G"]);
    }

    #[test]
    fn test_list_unfiltered_and_paged() {
        let store = populated();
        let all = store.list(&VariantFilter::default(), 100, 0);
        assert_eq!(
            ids(&all),
            vec!["1_300_A_G", "2_100_C_T", "1_100_A_G", "1_200_A_G", "2_200_C_T"]
        );

        let page = store.list(&VariantFilter::default(), 2, 1);
        assert_eq!(ids(&page), vec!["2_100_C_T", "1_100_A_G"]);
    }

    #[test]
    fn test_chrom_filter_is_normalized_and_missing_qual_excluded() {
        let store = populated();
        store.upsert(variant("1\t400\t.\tA\tG\t.\tPASS\t."));

        let filter = VariantFilter {
            chrom: Some("chr1".to_string()),
            min_quality: None,
        };
        assert_eq!(store.list(&filter, 100, 0).len(), 4);

        let filter = VariantFilter {
            chrom: Some("CHR1".to_string()),
            min_quality: Some(0.0),
        };
        assert_eq!(store.list(&filter, 100, 0).len(), 3);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let store = populated();
        let original = store.get("2_100_C_T").unwrap();

        let mut annotations = AnnotationBundle::new();
        annotations.insert(AnnotationSource::ClinVar, AnnotationEntry::NoAnnotation);
        store.upsert(EnrichedVariant::new(
            parse_line("2\t100\t.\tC\tT\t99\tLowQual\t.").unwrap().unwrap(),
            annotations.clone(),
        ));

        assert_eq!(store.len(), 5);
        let replaced = store.get("2_100_C_T").unwrap();
        assert_eq!(replaced.record.qual, Some(99.0));
        assert_eq!(replaced.record.filter, "LowQual");
        assert_eq!(replaced.annotations, annotations);
        assert_eq!(replaced.created_at, original.created_at);
        assert!(replaced.updated_at >= original.updated_at);
        assert_eq!(ids(&store.list(&VariantFilter::default(), 2, 0))[1], "2_100_C_T");
    }

    #[test]
    fn test_unknown_identity_is_none() {
        let store = populated();
        assert!(store.get("9_1_A_G").is_none());
        assert!(!store.contains("9_1_A_G"));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_stats() {
        let store = VariantStore::new();
        let mut annotated = AnnotationBundle::new();
        annotated.insert(
            AnnotationSource::EnsemblVep,
            ConsequenceAnnotation::default().into(),
        );
        annotated.insert(
            AnnotationSource::ClinVar,
            AnnotationEntry::error("ClinVar API error: 404", Some(404)),
        );

        store.upsert(EnrichedVariant::new(
            parse_line("1\t10\t.\tA\tG\t1\tPASS\t.").unwrap().unwrap(),
            annotated,
        ));
        store.upsert(variant("1\t20\t.\tAT\tG\t1\tPASS\t."));

        let stats = store.stats();
        assert_eq!(stats.total_variants, 2);
        assert_eq!(stats.variant_types.get("1_1"), Some(&1));
        assert_eq!(stats.variant_types.get("2_1"), Some(&1));
        assert_eq!(stats.annotation_success_rates[&AnnotationSource::EnsemblVep], 0.5);
        assert_eq!(stats.annotation_success_rates[&AnnotationSource::ClinVar], 0.0);

        let empty = VariantStore::new().stats();
        assert_eq!(empty.annotation_success_rates.len(), 2);
    }
}
