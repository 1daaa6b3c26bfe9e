// URL helpers shared by the stores and the orchestrator.
//
// Profile URLs arrive in many shapes (trailing slash, tracking query, mixed-case
// host, mobile subdomain). Everything that compares or keys on a profile URL
// goes through `normalize_profile_url` first.

/// Canonical form of a profile or company URL for comparison and ledger keys.
pub fn normalize_profile_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut parsed) = url::Url::parse(trimmed) else {
        return trimmed.trim_end_matches('/').to_lowercase();
    };

    parsed.set_query(None);
    parsed.set_fragment(None);

    let host = parsed
        .host_str()
        .map(|h| h.to_lowercase())
        .unwrap_or_default();
    let host = match host
        .strip_prefix("m.")
        .or_else(|| host.strip_prefix("mobile."))
    {
        Some(bare) => format!("www.{bare}"),
        None => host.clone(),
    };

    let path = parsed.path().trim_end_matches('/').to_lowercase();
    format!("https://{host}{path}")
}

/// What kind of page a visited URL is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    CompanyHome { slug: String },
    CompanyJobs { slug: String },
    CompanyPosts { slug: String },
    PersonProfile { profile_url: String },
    Connections,
    Other,
}

/// Classify a visited URL by its path shape.
pub fn classify_page(raw: &str) -> PageKind {
    let Ok(parsed) = url::Url::parse(raw.trim()) else {
        return PageKind::Other;
    };
    let segments: Vec<String> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).map(|seg| seg.to_lowercase()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [first, slug] if first == "company" => PageKind::CompanyHome { slug: slug.clone() },
        [first, slug, section, ..] if first == "company" => match section.as_str() {
            "jobs" => PageKind::CompanyJobs { slug: slug.clone() },
            "posts" => PageKind::CompanyPosts { slug: slug.clone() },
            _ => PageKind::CompanyHome { slug: slug.clone() },
        },
        [first, slug, ..] if first == "in" => {
            // Sub-pages like /in/<slug>/details/experience/ belong to the profile.
            let mut profile = parsed.clone();
            profile.set_path(&format!("/in/{slug}"));
            PageKind::PersonProfile {
                profile_url: normalize_profile_url(profile.as_str()),
            }
        }
        [first, rest @ ..]
            if first == "mynetwork" && rest.iter().any(|s| s.contains("connections")) =>
        {
            PageKind::Connections
        }
        _ => PageKind::Other,
    }
}

/// `https://www.linkedin.com/company/acme-corp/jobs/` → `acme-corp`
pub fn company_slug(company_url: &str) -> Option<String> {
    match classify_page(company_url) {
        PageKind::CompanyHome { slug }
        | PageKind::CompanyJobs { slug }
        | PageKind::CompanyPosts { slug } => Some(slug),
        _ => None,
    }
}
