//! Inspect command - print the persisted snapshot.

use std::fmt::Write;
use std::path::PathBuf;

use sensorcache::cache::{load_snapshot, ContentCache};
use sensorcache::model::TimeExtrema;

use crate::error::CliError;
use crate::runner::CliRunner;

/// What to print.
pub enum InspectTarget {
    Summary,
    Offering(String),
    Procedure(String),
}

/// Arguments for the inspect command.
pub struct InspectArgs {
    pub snapshot: Option<PathBuf>,
    pub target: InspectTarget,
    pub json: bool,
}

/// Run the inspect command.
pub fn run(runner: &CliRunner, args: InspectArgs) -> Result<(), CliError> {
    let path = args
        .snapshot
        .or_else(|| runner.config().cache.snapshot_file.clone())
        .ok_or_else(|| CliError::NoSnapshot("snapshot persistence is disabled".to_string()))?;
    let cache = load_snapshot(&path)?
        .ok_or_else(|| CliError::NoSnapshot(format!("{} does not exist", path.display())))?;

    let text = match (&args.target, args.json) {
        (InspectTarget::Summary, true) => to_json(&cache)?,
        (InspectTarget::Summary, false) => format_summary(&cache),
        (InspectTarget::Offering(id), true) => to_json(
            cache
                .offering(id)
                .ok_or_else(|| not_found("offering", id))?,
        )?,
        (InspectTarget::Offering(id), false) => {
            format_offering(&cache, id).ok_or_else(|| not_found("offering", id))?
        }
        (InspectTarget::Procedure(id), true) => to_json(
            cache
                .procedure(id)
                .ok_or_else(|| not_found("procedure", id))?,
        )?,
        (InspectTarget::Procedure(id), false) => {
            format_procedure(&cache, id).ok_or_else(|| not_found("procedure", id))?
        }
    };
    println!("{}", text);
    Ok(())
}

fn not_found(kind: &'static str, id: &str) -> CliError {
    CliError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::Runtime(e.to_string()))
}

fn list<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = items.into_iter().map(String::as_str).collect();
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined.join(", ")
    }
}

fn extrema(time: &TimeExtrema) -> String {
    match (time.min, time.max) {
        (Some(min), Some(max)) => format!("{} .. {}", min.to_rfc3339(), max.to_rfc3339()),
        _ => "-".to_string(),
    }
}

/// Service-wide overview of a snapshot.
pub fn format_summary(cache: &ContentCache) -> String {
    let counts = cache.counts();
    let mut out = String::new();
    let _ = writeln!(out, "Content Cache");
    let _ = writeln!(out, "=============");
    let _ = writeln!(
        out,
        "Built:       {}",
        cache
            .built_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string())
    );
    let _ = writeln!(out, "Offerings:   {}", counts.offerings);
    let _ = writeln!(out, "Procedures:  {}", counts.procedures);
    let _ = writeln!(out, "Properties:  {}", counts.observable_properties);
    let _ = writeln!(out, "Features:    {}", counts.features_of_interest);
    let _ = writeln!(out, "Templates:   {}", counts.result_templates);
    let _ = writeln!(
        out,
        "Envelope:    {}",
        cache
            .global_envelope()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    let srids: Vec<String> = cache
        .supported_spatial_reference_codes()
        .iter()
        .map(|c| c.to_string())
        .collect();
    let _ = writeln!(out, "SRIDs:       {}", if srids.is_empty() { "-".to_string() } else { srids.join(", ") });
    let languages: Vec<&str> = cache.supported_languages().iter().map(|l| l.as_str()).collect();
    let _ = write!(out, "Languages:   {}", if languages.is_empty() { "-".to_string() } else { languages.join(", ") });

    if counts.offerings > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out);
        let _ = write!(out, "[offerings]");
        for offering in cache.offerings() {
            let _ = write!(
                out,
                "\n  {} ({}): {} procedure(s), {} feature(s)",
                offering.id,
                offering.name,
                offering.procedures.len(),
                offering.features_of_interest.len()
            );
        }
    }
    out
}

/// Detail view of one offering.
pub fn format_offering(cache: &ContentCache, id: &str) -> Option<String> {
    let offering = cache.offering(id)?;
    let types: Vec<&str> = offering.observation_types.iter().map(|t| t.uri()).collect();
    let mut out = String::new();
    let _ = writeln!(out, "Offering {}", offering.id);
    let _ = writeln!(out, "  Name:               {}", offering.name);
    let _ = writeln!(out, "  Procedures:         {}", list(&offering.procedures));
    let _ = writeln!(out, "  Hidden children:    {}", list(&offering.hidden_child_procedures));
    let _ = writeln!(out, "  Properties:         {}", list(&offering.observable_properties));
    let _ = writeln!(out, "  Features:           {}", list(&offering.features_of_interest));
    let _ = writeln!(out, "  Related features:   {}", list(&offering.related_features));
    let _ = writeln!(
        out,
        "  Observation types:  {}",
        if types.is_empty() { "-".to_string() } else { types.join(", ") }
    );
    let _ = writeln!(out, "  Feature types:      {}", list(&offering.feature_types));
    let _ = writeln!(
        out,
        "  Envelope:           {}",
        offering
            .envelope
            .map(|e| e.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    let _ = writeln!(out, "  Phenomenon time:    {}", extrema(&offering.phenomenon_time));
    let _ = write!(out, "  Result time:        {}", extrema(&offering.result_time));
    Some(out)
}

/// Detail view of one procedure.
pub fn format_procedure(cache: &ContentCache, id: &str) -> Option<String> {
    let procedure = cache.procedure(id)?;
    let mut out = String::new();
    let _ = writeln!(out, "Procedure {}", procedure.id);
    let _ = writeln!(out, "  Name:               {}", procedure.name);
    let _ = writeln!(
        out,
        "  Published:          {}",
        if cache.is_published_procedure(id) { "yes" } else { "no" }
    );
    let _ = writeln!(out, "  Offerings:          {}", list(&procedure.offerings));
    let _ = writeln!(out, "  Properties:         {}", list(&procedure.observable_properties));
    let _ = writeln!(out, "  Parents:            {}", list(&procedure.parents));
    let _ = writeln!(out, "  Ancestors:          {}", list(&procedure.ancestors));
    let _ = writeln!(out, "  Children:           {}", list(&procedure.children));
    let _ = write!(out, "  Phenomenon time:    {}", extrema(&procedure.phenomenon_time));
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sensorcache::model::{ObservationType, OfferingRecord, ProcedureRecord};
    use sensorcache::store::{Dataset, MemoryStore};
    use sensorcache::update::{CacheRebuild, CacheSettings, RebuildScope};

    fn cache() -> ContentCache {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let store = MemoryStore::new(
            Dataset::new()
                .with_offering(OfferingRecord::new("urn:example:offering:air"))
                .with_procedure(ProcedureRecord::new("P1"))
                .observe("P1", "temp", "urn:example:offering:air", "F1", ObservationType::Numeric, at),
        );
        CacheRebuild::new(&store, &CacheSettings::default())
            .run(&RebuildScope::Full, 1)
            .cache
    }

    #[test]
    fn test_summary_lists_offerings() {
        let text = format_summary(&cache());
        assert!(text.contains("Offerings:   1"));
        assert!(text.contains("urn:example:offering:air (air): 1 procedure(s)"));
    }

    #[test]
    fn test_offering_detail() {
        let text = format_offering(&cache(), "urn:example:offering:air").unwrap();
        assert!(text.contains("Procedures:         P1"));
        assert!(text.contains("Hidden children:    -"));
        assert!(text.contains("OM_Measurement"));
        assert!(text.contains("2024-05-01T00:00:00+00:00 .. 2024-05-01T00:00:00+00:00"));
    }

    #[test]
    fn test_unknown_entities() {
        let cache = cache();
        assert!(format_offering(&cache, "nope").is_none());
        assert!(format_procedure(&cache, "nope").is_none());
    }
}
