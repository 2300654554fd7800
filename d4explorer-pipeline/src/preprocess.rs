//! Per-feature histogram computation.
//!
//! One region file is written per feature and one depth tool invocation is
//! queued per feature on a [MaxQueuePool]. Results are collected in
//! completion order and put back in feature order, genome first.

use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use d4explorer_cache::{D4ExplorerCache, cache_key, load_annotated_hist, store_annotated_hist};
use d4explorer_core::models::{Feature, GENOME_FEATURE};
use d4explorer_core::utils::{inner_stem, read_chrom_sizes};
use d4explorer_hist::{Annotation, AnnotationData, D4AnnotatedHist, D4Hist, order_features};

use crate::config::{FailurePolicy, PreprocessOptions};
use crate::errors::{PipelineError, Result};
use crate::pool::{MaxQueuePool, as_completed};
use crate::tools::HistogramSource;

#[derive(Debug)]
pub struct PreprocessReport {
    pub hist: D4AnnotatedHist,
    /// Features left out under [FailurePolicy::Skip], with their errors
    pub failures: Vec<(String, PipelineError)>,
    pub cache_key: Option<String>,
    /// True when `hist` was read from the cache
    pub from_cache: bool,
}

///
/// The features of one run: the genome, then one feature per GFF3 type or
/// a single feature for a BED annotation, in display order.
///
/// The genome comes from `options.chrom_sizes` if set, otherwise from the
/// depth file itself. Annotation features are merged.
///
pub fn make_features(
    source: &dyn HistogramSource,
    path: &Path,
    options: &PreprocessOptions,
) -> Result<(Vec<Feature>, Option<Annotation>)> {
    let chrom_sizes = match &options.chrom_sizes {
        Some(sizes) => read_chrom_sizes(sizes)?,
        None => source.chrom_sizes(path)?,
    };
    let genome = Feature::from_chrom_sizes(GENOME_FEATURE, &chrom_sizes).with_source_path(path);
    info!(
        sequences = chrom_sizes.len(),
        genome_size = genome.total_length(),
        "made genome feature"
    );
    let mut features = vec![genome];

    let Some(annotation_file) = &options.annotation_file else {
        return Ok((features, None));
    };

    info!(annotation = %annotation_file.display(), "reading annotation");
    let annotation = Annotation::from_path(annotation_file)?;
    let mut annotated = match annotation.data()? {
        AnnotationData::Bed(bed) => {
            let name = inner_stem(annotation_file)
                .unwrap_or_else(|| annotation_file.display().to_string());
            vec![Feature::from_bed(bed, name)]
        }
        AnnotationData::Gff3(gff) => gff
            .feature_types()
            .iter()
            .map(|t| Feature::from_gff3_slice(gff, t))
            .collect(),
    };

    for mut feature in annotated.drain(..) {
        if feature.is_genome() {
            warn!(feature = %feature.name, "annotation feature shadows the genome, ignored");
            continue;
        }
        feature.merge();
        debug!(feature = %feature.name, length = %feature.format_length(), "made annotation feature");
        features.push(feature);
    }

    let names: Vec<&str> = features.iter().map(|f| f.name.as_str()).collect();
    let order = order_features(&names);
    features.sort_by_key(|f| {
        order
            .iter()
            .position(|n| *n == f.name)
            .unwrap_or(usize::MAX)
    });

    Ok((features, Some(annotation)))
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
    {
        bar.set_style(style.progress_chars("##-"));
    }
    bar
}

///
/// Compute the histograms of every feature of `path`.
///
/// A failing genome histogram always fails the run. Other failures follow
/// `options.on_error`.
///
pub fn preprocess(
    source: Arc<dyn HistogramSource>,
    path: &Path,
    options: &PreprocessOptions,
) -> Result<PreprocessReport> {
    options.validate()?;
    let (features, annotation) = make_features(source.as_ref(), path, options)?;
    let genome_size = features
        .iter()
        .find(|f| f.is_genome())
        .map(Feature::total_length)
        .unwrap_or_default();

    let pool = MaxQueuePool::new(options.threads, options.queue_size())?;
    let cancel = pool.cancel_token();
    info!(
        path = %path.display(),
        features = features.len(),
        threads = options.threads,
        max_queue_size = pool.max_queue_size(),
        "computing histograms"
    );

    let mut region_files = Vec::with_capacity(features.len());
    let mut handles = Vec::with_capacity(features.len());
    for feature in &features {
        if cancel.is_cancelled() {
            break;
        }
        let region_file = feature.materialize_to_temp_region_file()?;
        let regions = region_file.path().to_path_buf();
        region_files.push(region_file);

        let source = Arc::clone(&source);
        let cancel = cancel.clone();
        let path = path.to_path_buf();
        let max_bins = options.max_bins;
        let stop_on_error = feature.is_genome() || options.on_error == FailurePolicy::Abort;
        handles.push(pool.submit(move || {
            let rows = source.histogram(&path, &regions, max_bins);
            if rows.is_err() && stop_on_error {
                cancel.cancel();
            }
            rows
        })?);
    }

    let bar = progress_bar(handles.len(), options.progress);
    let mut hists: Vec<Option<D4Hist>> = features.iter().map(|_| None).collect();
    let mut failures = Vec::new();
    for (index, outcome) in as_completed(handles) {
        let feature = &features[index];
        bar.set_message(feature.name.clone());
        bar.inc(1);
        match outcome
            .and_then(|rows| rows)
            .and_then(|rows| Ok(D4Hist::from_raw(&rows)?))
        {
            Ok(hist) => {
                debug!(feature = %feature.name, bins = hist.len(), "histogram done");
                hists[index] = Some(
                    hist.with_feature(feature.clone())
                        .with_genome_size(genome_size),
                );
            }
            Err(PipelineError::Cancelled) => {
                debug!(feature = %feature.name, "histogram cancelled");
                failures.push((feature.name.clone(), PipelineError::Cancelled));
            }
            Err(err) => {
                error!(feature = %feature.name, error = %err, "histogram failed");
                failures.push((feature.name.clone(), err));
            }
        }
    }
    bar.finish_and_clear();
    drop(region_files);

    let stops_run =
        |name: &str| name == GENOME_FEATURE || options.on_error == FailurePolicy::Abort;
    let cancelled = |err: &PipelineError| matches!(err, PipelineError::Cancelled);
    if failures.iter().any(|(name, _)| stops_run(name.as_str())) {
        // report the failure that stopped the run, not a task it cancelled
        let pos = failures
            .iter()
            .position(|(name, err)| stops_run(name.as_str()) && !cancelled(err))
            .or_else(|| failures.iter().position(|(_, err)| !cancelled(err)))
            .unwrap_or(0);
        let (feature, err) = failures.swap_remove(pos);
        return Err(PipelineError::FeatureFailed {
            feature,
            source: Box::new(err),
        });
    }
    if !failures.is_empty() {
        let names: Vec<&str> = failures.iter().map(|(name, _)| name.as_str()).collect();
        warn!(
            failed = failures.len(),
            total = features.len(),
            features = %names.join(", "),
            "some features were skipped"
        );
    }

    let members: Vec<D4Hist> = hists.into_iter().flatten().collect();
    info!(members = members.len(), genome_size, "computed histograms");
    let hist = D4AnnotatedHist::new(members, path, options.max_bins, genome_size, annotation)?;

    Ok(PreprocessReport {
        hist,
        failures,
        cache_key: None,
        from_cache: false,
    })
}

///
/// Like [preprocess], but read the result from `cache` when present and
/// store it otherwise. Results with skipped features are not stored.
///
pub fn preprocess_cached(
    cache: &D4ExplorerCache,
    source: Arc<dyn HistogramSource>,
    path: &Path,
    options: &PreprocessOptions,
) -> Result<PreprocessReport> {
    let key = cache_key(path, options.max_bins, options.annotation_file.as_deref())?;
    if let Some(hist) = load_annotated_hist(cache, &key)? {
        info!(key = %key, "loaded histograms from cache");
        return Ok(PreprocessReport {
            hist,
            failures: Vec::new(),
            cache_key: Some(key),
            from_cache: true,
        });
    }

    let mut report = preprocess(source, path, options)?;
    if report.failures.is_empty() {
        let stored = store_annotated_hist(cache, &report.hist)?;
        info!(key = %stored, "stored histograms in cache");
        report.cache_key = Some(stored);
    } else {
        warn!(key = %key, "incomplete result, not cached");
    }
    Ok(report)
}
