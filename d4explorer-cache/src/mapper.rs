//! Conversion between domain objects and cache entries.
//!
//! A [D4AnnotatedHist] is stored as a tree of entries: one `Feature` and one
//! `D4Hist` entry per member, one `GFF3`/`Bed` entry for the annotation, and
//! the dataset entry itself, whose metadata lists the keys of its parts. The
//! dataset entry is written last, so its key only resolves once every part
//! is in place.

use std::path::PathBuf;

use tracing::info;

use d4explorer_core::models::{Feature, Gff3};
use d4explorer_hist::{Annotation, AnnotationData, D4AnnotatedHist, D4Hist};

use crate::client::{CacheEntry, D4ExplorerCache};
use crate::errors::{CacheError, Result};
use crate::keys::{ClassTag, annotation_key, cache_key, is_dataset_key, member_key};
use crate::metadata::{Kwargs, Metadata};
use crate::payload::Payload;

fn check_class(key: &str, metadata: &Metadata, expected: ClassTag) -> Result<()> {
    if metadata.class != expected {
        return Err(CacheError::ClassMismatch {
            key: key.to_string(),
            expected: expected.to_string(),
            found: metadata.class.to_string(),
        });
    }
    Ok(())
}

fn require(cache: &D4ExplorerCache, parent: &str, child: &str) -> Result<CacheEntry> {
    cache.get(child)?.ok_or_else(|| CacheError::MissingChild {
        parent: parent.to_string(),
        child: child.to_string(),
    })
}

fn missing_kwarg(key: &str, name: &str) -> CacheError {
    CacheError::SchemaValidation(format!("{}: kwargs.{} is required", key, name))
}

pub fn feature_to_entry(feature: &Feature, key: &str) -> (Metadata, Payload) {
    let metadata = Metadata::new(key, ClassTag::Feature, format!("name={}", feature.name))
        .with_kwargs(Kwargs {
            name: Some(feature.name.clone()),
            path: feature
                .source_path
                .as_ref()
                .map(|p| p.display().to_string()),
            ..Default::default()
        });
    (metadata, Payload::Intervals(feature.intervals.clone()))
}

pub fn feature_from_entry(key: &str, entry: CacheEntry) -> Result<Feature> {
    check_class(key, &entry.metadata, ClassTag::Feature)?;
    let Some(Payload::Intervals(intervals)) = entry.payload else {
        return Err(CacheError::MissingPayload(key.to_string()));
    };
    let name = entry
        .metadata
        .kwargs
        .name
        .ok_or_else(|| missing_kwarg(key, "name"))?;
    let mut feature = Feature::new(name, intervals);
    feature.source_path = entry.metadata.kwargs.path.map(PathBuf::from);
    Ok(feature)
}

pub fn hist_to_entry(hist: &D4Hist, key: &str, feature_key: Option<&str>) -> (Metadata, Payload) {
    let metadata = Metadata::new(
        key,
        ClassTag::D4Hist,
        format!("feature={}", hist.feature_name().unwrap_or_default()),
    )
    .with_kwargs(Kwargs {
        feature: feature_key.map(String::from),
        genome_size: hist.genome_size(),
        ..Default::default()
    });
    let payload = Payload::Bins {
        x: hist.x().to_vec(),
        counts: hist.counts().to_vec(),
        low_label: hist.low_label().map(String::from),
        high_label: hist.high_label().map(String::from),
    };
    (metadata, payload)
}

///
/// Rebuild a histogram without its feature; the feature key, if any, is
/// in the returned metadata's kwargs.
///
pub fn hist_from_entry(key: &str, entry: CacheEntry) -> Result<(D4Hist, Metadata)> {
    check_class(key, &entry.metadata, ClassTag::D4Hist)?;
    let Some(Payload::Bins {
        x,
        counts,
        low_label,
        high_label,
    }) = entry.payload
    else {
        return Err(CacheError::MissingPayload(key.to_string()));
    };
    let mut hist = D4Hist::from_parts(x, counts, low_label, high_label)?;
    if let Some(genome_size) = entry.metadata.kwargs.genome_size {
        hist.set_genome_size(genome_size);
    }
    Ok((hist, entry.metadata))
}

pub fn annotation_to_entry(annotation: &Annotation, key: &str) -> Result<(Metadata, Payload)> {
    let (class, payload) = match annotation.data()? {
        AnnotationData::Gff3(gff) => (ClassTag::Gff3, Payload::Gff3(gff.records.clone())),
        AnnotationData::Bed(bed) => (ClassTag::Bed, Payload::Bed(bed.clone())),
    };
    let metadata = Metadata::new(key, class, "").with_kwargs(Kwargs {
        path: Some(annotation.path().display().to_string()),
        ..Default::default()
    });
    Ok((metadata, payload))
}

pub fn annotation_from_entry(key: &str, entry: CacheEntry) -> Result<Annotation> {
    let path = entry
        .metadata
        .kwargs
        .path
        .map(PathBuf::from)
        .ok_or_else(|| missing_kwarg(key, "path"))?;
    let data = match (entry.metadata.class, entry.payload) {
        (ClassTag::Gff3, Some(Payload::Gff3(records))) => AnnotationData::Gff3(Gff3 {
            records,
            label: None,
            path: Some(path.clone()),
        }),
        (ClassTag::Bed, Some(Payload::Bed(bed))) => AnnotationData::Bed(bed),
        (ClassTag::Gff3, _) | (ClassTag::Bed, _) => {
            return Err(CacheError::MissingPayload(key.to_string()));
        }
        (other, _) => {
            return Err(CacheError::ClassMismatch {
                key: key.to_string(),
                expected: "GFF3 or Bed".to_string(),
                found: other.to_string(),
            });
        }
    };
    Ok(Annotation::with_data(path, data))
}

///
/// Store a dataset and all its parts. Returns the dataset key.
///
/// Nothing is written if the dataset key is already present.
///
pub fn store_annotated_hist(cache: &D4ExplorerCache, hist: &D4AnnotatedHist) -> Result<String> {
    let key = cache_key(
        hist.path(),
        hist.max_bins(),
        hist.annotation().map(Annotation::path),
    )?;
    if cache.has(&key)? {
        info!(key = %key, "dataset already cached");
        return Ok(key);
    }

    let mut members = Vec::with_capacity(hist.len());
    for (i, member) in hist.members().iter().enumerate() {
        let name = format!("{}-{}", i, member.feature_name().unwrap_or("anonymous"));

        let feature_key = match member.feature() {
            Some(feature) => {
                let feature_key = member_key(&key, ClassTag::Feature, &name);
                let (metadata, payload) = feature_to_entry(feature, &feature_key);
                cache.add(&feature_key, &metadata, Some(&payload))?;
                Some(feature_key)
            }
            None => None,
        };

        let hist_key = member_key(&key, ClassTag::D4Hist, &name);
        let (metadata, payload) = hist_to_entry(member, &hist_key, feature_key.as_deref());
        cache.add(&hist_key, &metadata, Some(&payload))?;
        members.push(hist_key);
    }

    let annotation = match hist.annotation() {
        Some(annotation) => {
            let class = match annotation.data()? {
                AnnotationData::Gff3(_) => ClassTag::Gff3,
                AnnotationData::Bed(_) => ClassTag::Bed,
            };
            let annotation_key = annotation_key(annotation.path(), class)?;
            let (metadata, payload) = annotation_to_entry(annotation, &annotation_key)?;
            cache.add(&annotation_key, &metadata, Some(&payload))?;
            Some(annotation_key)
        }
        None => None,
    };

    let metadata = Metadata::new(
        key.as_str(),
        ClassTag::D4AnnotatedHist,
        format!("max_bins={}", hist.max_bins()),
    )
    .with_kwargs(Kwargs {
        members,
        annotation,
        genome_size: Some(hist.genome_size()),
        max_bins: Some(hist.max_bins()),
        path: Some(hist.path().display().to_string()),
        ..Default::default()
    });
    cache.add(&key, &metadata, None)?;
    Ok(key)
}

///
/// Load a dataset and its parts. `Ok(None)` on a cache miss.
///
pub fn load_annotated_hist(cache: &D4ExplorerCache, key: &str) -> Result<Option<D4AnnotatedHist>> {
    let Some(entry) = cache.get(key)? else {
        return Ok(None);
    };
    check_class(key, &entry.metadata, ClassTag::D4AnnotatedHist)?;
    let kwargs = entry.metadata.kwargs;

    let genome_size = kwargs
        .genome_size
        .ok_or_else(|| missing_kwarg(key, "genome_size"))?;
    let max_bins = kwargs.max_bins.ok_or_else(|| missing_kwarg(key, "max_bins"))?;
    let path = kwargs.path.ok_or_else(|| missing_kwarg(key, "path"))?;

    let mut members = Vec::with_capacity(kwargs.members.len());
    for member_key in &kwargs.members {
        let (mut hist, metadata) = hist_from_entry(member_key, require(cache, key, member_key)?)?;
        if let Some(feature_key) = &metadata.kwargs.feature {
            let feature =
                feature_from_entry(feature_key, require(cache, member_key, feature_key)?)?;
            hist = hist.with_feature(feature);
        }
        members.push(hist);
    }

    let annotation = match &kwargs.annotation {
        Some(annotation_key) => Some(annotation_from_entry(
            annotation_key,
            require(cache, key, annotation_key)?,
        )?),
        None => None,
    };

    Ok(Some(D4AnnotatedHist::new(
        members,
        path,
        max_bins,
        genome_size,
        annotation,
    )?))
}

///
/// Keys of all cached datasets, sorted.
///
pub fn list_datasets(cache: &D4ExplorerCache) -> Result<Vec<String>> {
    Ok(cache
        .keys()?
        .into_iter()
        .filter(|k| is_dataset_key(k))
        .collect())
}
