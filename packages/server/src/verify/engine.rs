//! The verification state machine.
//!
//! A claim moves through extraction and normalization, a same-as-original
//! check, an optional round trip to the social API, and finally a local format
//! check. Transport failures against the API are logged and recovered locally:
//! the endpoint favours availability over strictness, so it is a UX guard and
//! not an integrity check.

use std::sync::Arc;

use super::{
    error::VerifyError,
    extract::{extract_reference, is_platform_url},
    hash::{is_well_formed, same_reference, HashNormalizer},
    lookup::{CastLookup, CastRecord},
    Strictness, VerificationRequest,
};

const NOTE_API_UNAVAILABLE: &str = "Verification skipped - API unavailable; format validated only";
const NOTE_NOT_FOUND: &str = "Cast not found via Neynar; format validated only";
const NOTE_UNRELATED: &str = "Could not verify relationship to the original cast";
const NOTE_NO_ORIGINAL: &str = "No original cast supplied; relationship not checked";

/// Which stage produced an acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    Upstream,
    LocalFormat,
}

/// An accepted claim. `recast_hash` is canonical whichever stage accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub recast_hash: String,
    pub message: String,
    pub note: Option<String>,
    pub recast_count: Option<u64>,
    pub source: VerdictSource,
}

/// A reference as pasted and in canonical form.
#[derive(Debug, Clone)]
struct Reference {
    /// Extracted identifier, suitable for upstream lookups.
    extracted: String,
    canonical: String,
}

enum UpstreamOutcome {
    Confirmed(Verdict),
    FallThrough(&'static str),
}

pub struct Verifier {
    normalizer: Arc<dyn HashNormalizer>,
    lookup: Option<Arc<dyn CastLookup>>,
    strictness: Strictness,
}

impl Verifier {
    pub fn new(
        normalizer: Arc<dyn HashNormalizer>,
        lookup: Option<Arc<dyn CastLookup>>,
        strictness: Strictness,
    ) -> Self {
        Self {
            normalizer,
            lookup,
            strictness,
        }
    }

    pub fn has_lookup(&self) -> bool {
        self.lookup.is_some()
    }

    /// Social API outages degrade to the local format check in every
    /// strictness mode, so this holds whenever a lookup is configured.
    pub fn falls_back_when_unavailable(&self) -> bool {
        self.has_lookup()
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn supports_short_hashes(&self) -> bool {
        self.normalizer.expands_short_hashes()
    }

    /// Canonical form of a pasted reference.
    pub fn canonicalize(&self, input: &str) -> String {
        self.reference(input).canonical
    }

    fn reference(&self, input: &str) -> Reference {
        let extracted = extract_reference(input);
        let canonical = self.normalizer.normalize(&extracted);
        Reference {
            extracted,
            canonical,
        }
    }

    pub async fn verify(&self, req: &VerificationRequest) -> Result<Verdict, VerifyError> {
        let cast_url = req
            .cast_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| VerifyError::MalformedRequest("castUrl is required".to_string()))?;

        let claimed = self.reference(cast_url);
        let original = req
            .original_cast_hash
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| self.reference(s));

        tracing::debug!(
            claimed = %claimed.canonical,
            original = ?original.as_ref().map(|o| &o.canonical),
            "verifying recast claim"
        );

        if let Some(ref orig) = original {
            if same_reference(&claimed.canonical, &orig.canonical) {
                return Err(VerifyError::SameAsOriginal);
            }
        }

        let mut note = None;
        if let Some(ref lookup) = self.lookup {
            match self
                .check_upstream(lookup.as_ref(), cast_url, &claimed, original.as_ref(), req.fid())
                .await
            {
                Ok(UpstreamOutcome::Confirmed(verdict)) => return Ok(verdict),
                Ok(UpstreamOutcome::FallThrough(n)) => note = Some(n),
                Err(VerifyError::UpstreamUnavailable(e)) => {
                    tracing::warn!(error = %e, "social API unavailable, falling back to format check");
                    note = Some(NOTE_API_UNAVAILABLE);
                }
                Err(e) => return Err(e),
            }
        }

        if !is_well_formed(&claimed.canonical) {
            return Err(VerifyError::InvalidFormat);
        }

        Ok(Verdict {
            recast_hash: claimed.canonical,
            message: "Recast format validated".to_string(),
            note: note.map(str::to_string),
            recast_count: None,
            source: VerdictSource::LocalFormat,
        })
    }

    async fn check_upstream(
        &self,
        lookup: &dyn CastLookup,
        cast_url: &str,
        claimed: &Reference,
        original: Option<&Reference>,
        fid: Option<u64>,
    ) -> Result<UpstreamOutcome, VerifyError> {
        let Some(record) = self.resolve(lookup, cast_url, claimed).await? else {
            return match self.strictness {
                Strictness::Strict => Err(VerifyError::NotFound),
                Strictness::Lenient => Ok(UpstreamOutcome::FallThrough(NOTE_NOT_FOUND)),
            };
        };

        let mut verdict = Verdict {
            recast_hash: self.normalizer.normalize(&record.hash),
            message: "Recast verified via Neynar".to_string(),
            note: None,
            recast_count: record.recasts_count,
            source: VerdictSource::Upstream,
        };

        let Some(original) = original else {
            verdict.message = "Cast found via Neynar".to_string();
            verdict.note = Some(NOTE_NO_ORIGINAL.to_string());
            return Ok(UpstreamOutcome::Confirmed(verdict));
        };

        if same_reference(&self.normalizer.normalize(&record.hash), &original.canonical) {
            return Err(VerifyError::SameAsOriginal);
        }

        if self.references_original(lookup, &record, original, fid).await? {
            return Ok(UpstreamOutcome::Confirmed(verdict));
        }

        match self.strictness {
            Strictness::Strict => Err(VerifyError::NotARecast),
            Strictness::Lenient => {
                verdict.message = "Cast found via Neynar".to_string();
                verdict.note = Some(NOTE_UNRELATED.to_string());
                Ok(UpstreamOutcome::Confirmed(verdict))
            }
        }
    }

    /// Ask the API for the claimed cast, by URL first when one was pasted.
    async fn resolve(
        &self,
        lookup: &dyn CastLookup,
        cast_url: &str,
        claimed: &Reference,
    ) -> Result<Option<CastRecord>, VerifyError> {
        if is_platform_url(cast_url) {
            if let Some(record) = lookup.cast_by_url(cast_url).await? {
                return Ok(Some(record));
            }
        }
        if !claimed.extracted.starts_with("0x") {
            return Ok(None);
        }
        Ok(lookup.cast_by_hash(&claimed.extracted).await?)
    }

    async fn references_original(
        &self,
        lookup: &dyn CastLookup,
        record: &CastRecord,
        original: &Reference,
        fid: Option<u64>,
    ) -> Result<bool, VerifyError> {
        let matches = |h: &str| same_reference(&self.normalizer.normalize(h), &original.canonical);

        if record.parent_hash.as_deref().is_some_and(matches)
            || record.embedded_hashes.iter().any(|h| matches(h.as_str()))
        {
            return Ok(true);
        }

        if let Some(fid) = fid {
            let recasters = lookup.recasters(&original.extracted).await?;
            return Ok(recasters.contains(&fid));
        }

        Ok(false)
    }
}
