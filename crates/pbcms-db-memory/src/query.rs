//! Filtering, ordering and relevance scoring for in-memory listings.

use pbcms_core::{Banner, Service};
use pbcms_storage::{BannerQuery, Page, ServiceQuery};
use std::cmp::Ordering;

const TITLE_WEIGHT: u32 = 10;
const SHORT_DESCRIPTION_WEIGHT: u32 = 5;
const DESCRIPTION_WEIGHT: u32 = 1;

/// Catalog order: `display_order` ascending, newest first on ties.
pub(crate) fn catalog_order(a: &Service, b: &Service) -> Ordering {
    a.display_order
        .cmp(&b.display_order)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Weighted term-match score; 0 means no match.
pub(crate) fn relevance(service: &Service, terms: &[String]) -> u32 {
    let title = service.title.to_lowercase();
    let short = service.short_description.to_lowercase();
    let description = service.description.to_lowercase();
    terms
        .iter()
        .map(|term| {
            let mut score = 0;
            if title.contains(term.as_str()) {
                score += TITLE_WEIGHT;
            }
            if short.contains(term.as_str()) {
                score += SHORT_DESCRIPTION_WEIGHT;
            }
            if description.contains(term.as_str()) {
                score += DESCRIPTION_WEIGHT;
            }
            score
        })
        .sum()
}

fn search_terms(search: Option<&str>) -> Vec<String> {
    search
        .map(|s| s.split_whitespace().map(str::to_lowercase).collect())
        .unwrap_or_default()
}

pub(crate) fn run_service_query(services: Vec<Service>, query: &ServiceQuery) -> Page<Service> {
    let terms = search_terms(query.search.as_deref());
    let status = query.status.as_flag();

    let mut matched: Vec<(u32, Service)> = services
        .into_iter()
        .filter(|s| status.is_none_or(|flag| s.is_published == flag))
        .filter(|s| {
            query
                .show_on_homepage
                .is_none_or(|flag| s.show_on_homepage == flag)
        })
        .filter_map(|s| {
            if terms.is_empty() {
                return Some((0, s));
            }
            let score = relevance(&s, &terms);
            (score > 0).then_some((score, s))
        })
        .collect();

    matched.sort_by(|(score_a, a), (score_b, b)| {
        score_b.cmp(score_a).then_with(|| catalog_order(a, b))
    });

    paginate(
        matched.into_iter().map(|(_, s)| s).collect(),
        query.pagination.skip(),
        query.pagination.limit,
    )
}

pub(crate) fn run_banner_query(banners: Vec<Banner>, query: &BannerQuery) -> Page<Banner> {
    let status = query.status.as_flag();
    let mut matched: Vec<Banner> = banners
        .into_iter()
        .filter(|b| status.is_none_or(|flag| b.is_active == flag))
        .collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    paginate(matched, query.pagination.skip(), query.pagination.limit)
}

fn paginate<T>(items: Vec<T>, skip: u64, limit: u64) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(skip as usize)
        .take(limit as usize)
        .collect();
    Page::new(items, total)
}
