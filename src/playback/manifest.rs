use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ManifestError {
    #[error("response is not an HLS playlist")]
    MissingHeader,
    #[error("playlist lists no variants or segments")]
    Empty,
    #[error("invalid playlist url {0}")]
    BadUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Variant {
    pub(crate) uri: String,
    pub(crate) bandwidth: u64,
    pub(crate) height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Manifest {
    Master { variants: Vec<Variant> },
    Media { segments: usize, target_duration: Option<f64>, ended: bool },
}

impl Manifest {
    pub(crate) fn variant_count(&self) -> usize {
        match self {
            Self::Master { variants } => variants.len(),
            Self::Media { .. } => 1,
        }
    }

    pub(crate) fn summary(&self) -> String {
        match self {
            Self::Master { variants } => format!("master playlist, {} variant(s)", variants.len()),
            Self::Media {
                segments,
                target_duration,
                ended,
            } => format!(
                "{} media playlist, {segments} segment(s), target duration {}s",
                if *ended { "vod" } else { "live" },
                target_duration.map_or_else(|| "-".to_string(), |d| d.to_string())
            ),
        }
    }

    /// URL to hand to the player: the richest variant within `max_height`
    /// for a master playlist, the playlist itself otherwise.
    pub(crate) fn playback_url(&self, manifest_url: &str, max_height: Option<u32>) -> String {
        match self {
            Self::Master { variants } => choose_variant(variants, max_height)
                .map(|variant| variant.uri.clone())
                .unwrap_or_else(|| manifest_url.to_string()),
            Self::Media { .. } => manifest_url.to_string(),
        }
    }
}

pub(crate) fn choose_variant(variants: &[Variant], max_height: Option<u32>) -> Option<&Variant> {
    let within_cap = |variant: &&Variant| match (max_height, variant.height) {
        (Some(cap), Some(height)) => height <= cap,
        _ => true,
    };
    variants
        .iter()
        .filter(within_cap)
        .max_by_key(|variant| variant.bandwidth)
        .or_else(|| variants.iter().min_by_key(|variant| variant.bandwidth))
}

pub(crate) fn parse_manifest(raw: &str, manifest_url: &str) -> Result<Manifest, ManifestError> {
    let mut lines = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());
    if lines.next() != Some("#EXTM3U") {
        return Err(ManifestError::MissingHeader);
    }
    let base = Url::parse(manifest_url).map_err(|_| ManifestError::BadUrl(manifest_url.to_string()))?;

    let mut variants = Vec::new();
    let mut pending_variant: Option<(u64, Option<u32>)> = None;
    let mut segments = 0;
    let mut target_duration = None;
    let mut ended = false;

    for line in lines {
        if let Some(attrs) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            pending_variant = Some(parse_stream_inf(attrs));
        } else if let Some(value) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            target_duration = value.trim().parse::<f64>().ok();
        } else if line.starts_with("#EXTINF:") {
            segments += 1;
        } else if line == "#EXT-X-ENDLIST" {
            ended = true;
        } else if line.starts_with('#') {
            continue;
        } else if let Some((bandwidth, height)) = pending_variant.take() {
            variants.push(Variant {
                uri: resolve_uri(&base, line)?,
                bandwidth,
                height,
            });
        }
    }

    if !variants.is_empty() {
        return Ok(Manifest::Master { variants });
    }
    if segments == 0 {
        return Err(ManifestError::Empty);
    }
    Ok(Manifest::Media {
        segments,
        target_duration,
        ended,
    })
}

fn parse_stream_inf(attrs: &str) -> (u64, Option<u32>) {
    let mut bandwidth = 0;
    let mut height = None;
    for (key, value) in split_attributes(attrs) {
        match key {
            "BANDWIDTH" => bandwidth = value.parse::<u64>().unwrap_or(0),
            "RESOLUTION" => {
                height = value
                    .split_once('x')
                    .and_then(|(_, h)| h.parse::<u32>().ok());
            }
            _ => {}
        }
    }
    (bandwidth, height)
}

/// Splits `KEY=VALUE` pairs, keeping commas inside quoted values.
fn split_attributes(attrs: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (idx, ch) in attrs.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                push_attribute(&mut out, &attrs[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    push_attribute(&mut out, &attrs[start..]);
    out
}

fn push_attribute<'a>(out: &mut Vec<(&'a str, &'a str)>, pair: &'a str) {
    if let Some((key, value)) = pair.split_once('=') {
        out.push((key.trim(), value.trim().trim_matches('"')));
    }
}

fn resolve_uri(base: &Url, reference: &str) -> Result<String, ManifestError> {
    base.join(reference)
        .map(String::from)
        .map_err(|_| ManifestError::BadUrl(reference.to_string()))
}
