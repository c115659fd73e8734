//! Full-text search using Tantivy.
//!
//! The index holds active products, categories and combos. The app starts
//! with an empty index; a background task builds the real one from the
//! database, swaps it in, and rebuilds it every `SEARCH_REFRESH_SECS` so
//! catalog edits made in the back-office become searchable.

mod indexer;

use std::ops::Bound;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tantivy::collector::TopDocs;
use tantivy::query::{
    AllQuery, BooleanQuery, FuzzyTermQuery, Occur, Query, QueryClone, RangeQuery, RegexQuery,
    TermQuery,
};
use tantivy::schema::{
    Field, IndexRecordOption, STORED, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::tokenizer::{
    AsciiFoldingFilter, Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer,
    TextAnalyzer, TokenStream,
};
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyDocument, Term};
use tracing::instrument;

use jouwwinkel_core::Price;
use jouwwinkel_core::models::{Category, Combo, Product};

pub use indexer::{rebuild, spawn_refresh};

/// Name of the stemming tokenizer registered on every index.
const TOKENIZER: &str = "shop_stem";

/// Document types that can be indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    Product,
    Category,
    Combo,
}

impl DocType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Category => "category",
            Self::Combo => "combo",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "product" => Some(Self::Product),
            "category" => Some(Self::Category),
            "combo" => Some(Self::Combo),
            _ => None,
        }
    }

    /// Path of the page a result links to.
    #[must_use]
    pub fn url(self, slug: &str) -> String {
        match self {
            Self::Product => format!("/products/{slug}"),
            Self::Category => format!("/categories/{slug}"),
            Self::Combo => format!("/combos/{slug}"),
        }
    }
}

/// One thing to put in the index.
#[derive(Debug, Clone)]
pub struct SearchDocument {
    pub doc_type: DocType,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
    pub available: bool,
    /// Extra matchable words, e.g. the product's category name.
    pub tags: String,
}

impl SearchDocument {
    #[must_use]
    pub fn product(product: &Product, category_name: Option<&str>, available: bool) -> Self {
        Self {
            doc_type: DocType::Product,
            slug: product.slug.clone(),
            title: product.name.clone(),
            description: product.description.clone(),
            image_url: product.primary_image().map(str::to_owned),
            price: Some(product.price),
            available,
            tags: category_name.unwrap_or_default().to_owned(),
        }
    }

    #[must_use]
    pub fn category(category: &Category) -> Self {
        Self {
            doc_type: DocType::Category,
            slug: category.slug.clone(),
            title: category.name.clone(),
            description: category.description.clone().unwrap_or_default(),
            image_url: category.image_url.clone(),
            price: None,
            available: true,
            tags: String::new(),
        }
    }

    #[must_use]
    pub fn combo(combo: &Combo, available: bool) -> Self {
        Self {
            doc_type: DocType::Combo,
            slug: combo.slug.clone(),
            title: combo.name.clone(),
            description: combo.description.clone(),
            image_url: combo.image_url.clone(),
            price: Some(combo.price),
            available,
            tags: String::new(),
        }
    }
}

/// A search result item.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub doc_type: DocType,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    /// Display price such as `€12.50`.
    pub price: Option<String>,
    pub price_cents: Option<u64>,
    pub available: bool,
    pub score: f32,
}

impl SearchResult {
    #[must_use]
    pub fn url(&self) -> String {
        self.doc_type.url(&self.slug)
    }
}

/// Schema field handles for the search index.
#[derive(Clone)]
pub struct SearchFields {
    // Stored fields (returned in results)
    pub doc_type: Field,
    pub slug: Field,
    pub title: Field,
    pub description: Field,
    pub image_url: Field,
    pub price: Field,
    pub price_cents: Field,
    pub available: Field,
    // Text fields for full-text search (indexed only)
    pub title_text: Field,
    pub description_text: Field,
    pub tags_text: Field,
}

/// Inner index state (once built).
struct ReadyIndex {
    reader: IndexReader,
    fields: SearchFields,
    analyzer: TextAnalyzer,
}

impl ReadyIndex {
    /// Run query text through the same analyzer the documents went through.
    fn terms(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();
        while stream.advance() {
            terms.push(stream.token().text.clone());
        }
        terms
    }

    /// Exact and fuzzy matches on title, description and tags.
    fn text_query(&self, query_str: &str) -> Box<dyn Query> {
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        for term in self.terms(query_str) {
            let title_term = Term::from_field_text(self.fields.title_text, &term);
            subqueries.push((
                Occur::Should,
                Box::new(TermQuery::new(title_term.clone(), IndexRecordOption::Basic)),
            ));

            let tags_term = Term::from_field_text(self.fields.tags_text, &term);
            subqueries.push((
                Occur::Should,
                Box::new(TermQuery::new(tags_term, IndexRecordOption::Basic)),
            ));

            if term.chars().count() >= 3 {
                subqueries.push((
                    Occur::Should,
                    Box::new(FuzzyTermQuery::new(title_term, 1, true)),
                ));
                let desc_term = Term::from_field_text(self.fields.description_text, &term);
                subqueries.push((
                    Occur::Should,
                    Box::new(FuzzyTermQuery::new(desc_term, 1, true)),
                ));
            }
        }

        Box::new(BooleanQuery::new(subqueries))
    }

    fn doc_type_query(&self, doc_type: DocType) -> Box<dyn Query> {
        let term = Term::from_field_text(self.fields.doc_type, doc_type.as_str());
        Box::new(TermQuery::new(term, IndexRecordOption::Basic))
    }

    fn collect(
        &self,
        searcher: &tantivy::Searcher,
        query: &dyn Query,
        limit: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let top_docs = searcher
            .search(query, &TopDocs::with_limit(limit.max(1)))
            .map_err(|e| SearchError::Query(format!("Search failed: {e}")))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc = searcher
                .doc::<TantivyDocument>(doc_address)
                .map_err(|e| SearchError::Query(format!("Failed to retrieve doc: {e}")))?;
            results.push(doc_to_result(&self.fields, &doc, score)?);
        }
        Ok(results)
    }
}

/// The search index.
///
/// Starts empty and is populated asynchronously by a background task.
#[derive(Clone)]
pub struct SearchIndex {
    inner: Arc<RwLock<Option<ReadyIndex>>>,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchIndex {
    /// Create a new empty search index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Check if the index is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Build a fresh index from documents and swap it in.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Build` if writing the index fails.
    pub fn replace(&self, documents: &[SearchDocument]) -> Result<usize, SearchError> {
        let (index, fields) = build_index(documents)?;
        let analyzer = shop_analyzer();

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::Index(format!("Failed to create reader: {e}")))?;

        let ready = ReadyIndex {
            reader,
            fields,
            analyzer,
        };

        *self
            .inner
            .write()
            .map_err(|_| SearchError::Index("Lock poisoned".to_owned()))? = Some(ready);

        Ok(documents.len())
    }

    /// Search products with filters, plus matching categories and combos.
    ///
    /// Returns empty results if the index isn't ready yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the index lock is poisoned or the search query fails.
    #[instrument(skip(self))]
    // The read guard must outlive every use of `ready`, which borrows from it.
    #[allow(clippy::significant_drop_tightening)]
    pub fn search_filtered(
        &self,
        query_str: &str,
        filters: &SearchFilters,
        sort: SearchSort,
        limit: usize,
    ) -> Result<SearchResults, SearchError> {
        let query_str = query_str.trim().to_lowercase();

        let guard = self
            .inner
            .read()
            .map_err(|_| SearchError::Index("Lock poisoned".to_owned()))?;

        let Some(ready) = guard.as_ref() else {
            return Ok(SearchResults {
                query: query_str,
                ..Default::default()
            });
        };

        let searcher = ready.reader.searcher();

        let text: Box<dyn Query> = if query_str.is_empty() {
            Box::new(AllQuery)
        } else {
            ready.text_query(&query_str)
        };

        // Facets describe every matching product, before the filters
        let facet_query = BooleanQuery::new(vec![
            (Occur::Must, text.box_clone()),
            (Occur::Must, ready.doc_type_query(DocType::Product)),
        ]);
        let all_products = ready.collect(&searcher, &facet_query, FACET_LIMIT)?;
        let facets = Facets::from_results(&all_products);

        let filtered = apply_filters(
            text.box_clone(),
            ready.doc_type_query(DocType::Product),
            &ready.fields,
            filters,
        );
        let mut products = match sort {
            SearchSort::Relevance => ready.collect(&searcher, filtered.as_ref(), limit)?,
            SearchSort::PriceAsc | SearchSort::PriceDesc => {
                let mut all = ready.collect(&searcher, filtered.as_ref(), FACET_LIMIT)?;
                all.sort_by_key(|r| r.price_cents.unwrap_or(0));
                if sort == SearchSort::PriceDesc {
                    all.reverse();
                }
                all
            }
        };
        products.truncate(limit);

        let (categories, combos) = if query_str.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            let by_type = |doc_type| {
                BooleanQuery::new(vec![
                    (Occur::Must, text.box_clone()),
                    (Occur::Must, ready.doc_type_query(doc_type)),
                ])
            };
            (
                ready.collect(&searcher, &by_type(DocType::Category), SIDE_LIMIT)?,
                ready.collect(&searcher, &by_type(DocType::Combo), SIDE_LIMIT)?,
            )
        };

        Ok(SearchResults {
            products,
            categories,
            combos,
            query: query_str,
            total_count: facets.total,
            in_stock_count: facets.in_stock,
            out_of_stock_count: facets.total - facets.in_stock,
            min_price_cents: facets.min_price,
            max_price_cents: facets.max_price,
        })
    }

    /// Quick suggestions while typing. Short words match as prefixes.
    ///
    /// # Errors
    ///
    /// Returns an error if the index lock is poisoned or the search query fails.
    #[instrument(skip(self))]
    #[allow(clippy::significant_drop_tightening)]
    pub fn suggest(&self, query_str: &str, limit: usize) -> Result<SearchResults, SearchError> {
        let query_str = query_str.trim().to_lowercase();
        if query_str.is_empty() {
            return Ok(SearchResults::default());
        }

        let guard = self
            .inner
            .read()
            .map_err(|_| SearchError::Index("Lock poisoned".to_owned()))?;

        let Some(ready) = guard.as_ref() else {
            return Ok(SearchResults {
                query: query_str,
                ..Default::default()
            });
        };

        let searcher = ready.reader.searcher();

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Should, ready.text_query(&query_str))];
        for word in query_str.split_whitespace().filter(|w| w.chars().count() < 3) {
            let pattern = format!("{}.*", escape_regex(word));
            for field in [ready.fields.title_text, ready.fields.tags_text] {
                if let Ok(regex_query) = RegexQuery::from_pattern(&pattern, field) {
                    subqueries.push((Occur::Should, Box::new(regex_query)));
                }
            }
        }
        let query = BooleanQuery::new(subqueries);

        let mut results = SearchResults {
            query: query_str,
            ..Default::default()
        };
        for result in ready.collect(&searcher, &query, limit * 3)? {
            let bucket = match result.doc_type {
                DocType::Product => &mut results.products,
                DocType::Category => &mut results.categories,
                DocType::Combo => &mut results.combos,
            };
            if bucket.len() < limit {
                bucket.push(result);
            }
        }
        Ok(results)
    }

    /// Get the number of documents in the index, or 0 if not ready.
    #[must_use]
    pub fn num_docs(&self) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|r| r.reader.searcher().num_docs()))
            .unwrap_or(0)
    }
}

/// Most products considered for facets and price sorting.
const FACET_LIMIT: usize = 10_000;

/// Categories and combos shown beside the product results.
const SIDE_LIMIT: usize = 6;

fn shop_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(AsciiFoldingFilter)
        .filter(Stemmer::new(Language::Dutch))
        .build()
}

/// Build the schema for the search index.
fn build_schema() -> (Schema, SearchFields) {
    use tantivy::schema::{NumericOptions, STRING};

    let mut schema_builder = Schema::builder();

    // STRING means indexed but not tokenized (exact match)
    let doc_type = schema_builder.add_text_field("doc_type", STRING | STORED);
    let slug = schema_builder.add_text_field("slug", STORED);
    let title = schema_builder.add_text_field("title", STORED);
    let description = schema_builder.add_text_field("description", STORED);
    let image_url = schema_builder.add_text_field("image_url", STORED);
    let price = schema_builder.add_text_field("price", STORED);

    let numeric = NumericOptions::default()
        .set_stored()
        .set_indexed()
        .set_fast();
    let price_cents = schema_builder.add_u64_field("price_cents", numeric.clone());
    let available = schema_builder.add_u64_field("available", numeric);

    let text_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(text_indexing);

    let title_text = schema_builder.add_text_field("title_text", text_options.clone());
    let description_text = schema_builder.add_text_field("description_text", text_options.clone());
    let tags_text = schema_builder.add_text_field("tags_text", text_options);

    let fields = SearchFields {
        doc_type,
        slug,
        title,
        description,
        image_url,
        price,
        price_cents,
        available,
        title_text,
        description_text,
        tags_text,
    };

    (schema_builder.build(), fields)
}

/// Write documents into a new in-memory index.
fn build_index(documents: &[SearchDocument]) -> Result<(Index, SearchFields), SearchError> {
    let (schema, fields) = build_schema();
    let index = Index::create_in_ram(schema);
    index.tokenizers().register(TOKENIZER, shop_analyzer());

    let mut writer: tantivy::IndexWriter = index
        .writer(50_000_000)
        .map_err(|e| SearchError::Build(format!("Failed to create writer: {e}")))?;

    for document in documents {
        let price = document.price.map(|p| Price::eur(p).to_string()).unwrap_or_default();
        let doc = tantivy::doc!(
            fields.doc_type => document.doc_type.as_str(),
            fields.slug => document.slug.clone(),
            fields.title => document.title.clone(),
            fields.description => document.description.clone(),
            fields.image_url => document.image_url.clone().unwrap_or_default(),
            fields.price => price,
            fields.price_cents => document.price.map_or(0, price_cents),
            fields.available => u64::from(document.available),
            fields.title_text => document.title.clone(),
            fields.description_text => document.description.clone(),
            fields.tags_text => document.tags.clone()
        );
        writer
            .add_document(doc)
            .map_err(|e| SearchError::Build(format!("Failed to add {}: {e}", document.slug)))?;
    }

    writer
        .commit()
        .map_err(|e| SearchError::Build(format!("Failed to commit index: {e}")))?;

    Ok((index, fields))
}

/// Euros to whole cents, negative amounts as zero.
fn price_cents(amount: Decimal) -> u64 {
    (amount * Decimal::ONE_HUNDRED).round().to_u64().unwrap_or(0)
}

fn escape_regex(word: &str) -> String {
    word.chars()
        .flat_map(|c| match c {
            '.' | '*' | '+' | '?' | '^' | '$' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' => {
                vec!['\\', c]
            }
            _ => vec![c],
        })
        .collect()
}

/// Combine the text query with the product type and the user's filters.
fn apply_filters(
    base_query: Box<dyn Query>,
    type_query: Box<dyn Query>,
    fields: &SearchFields,
    filters: &SearchFilters,
) -> Box<dyn Query> {
    let mut must_clauses: Vec<(Occur, Box<dyn Query>)> =
        vec![(Occur::Must, base_query), (Occur::Must, type_query)];

    if let Some(available) = filters.available {
        let term = Term::from_field_u64(fields.available, u64::from(available));
        must_clauses.push((
            Occur::Must,
            Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
        ));
    }

    if filters.min_price_cents.is_some() || filters.max_price_cents.is_some() {
        let min = filters.min_price_cents.unwrap_or(0);
        let max = filters.max_price_cents.unwrap_or(u64::MAX);
        let range_query = RangeQuery::new(
            Bound::Included(Term::from_field_u64(fields.price_cents, min)),
            Bound::Included(Term::from_field_u64(fields.price_cents, max)),
        );
        must_clauses.push((Occur::Must, Box::new(range_query)));
    }

    Box::new(BooleanQuery::new(must_clauses))
}

/// Convert a Tantivy document to a search result.
fn doc_to_result(
    fields: &SearchFields,
    doc: &TantivyDocument,
    score: f32,
) -> Result<SearchResult, SearchError> {
    let get_text = |field: Field| -> String {
        doc.get_first(field)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_owned()
    };
    let get_u64 = |field: Field| -> Option<u64> { doc.get_first(field).and_then(|v| v.as_u64()) };
    let non_empty = |s: String| (!s.is_empty()).then_some(s);

    let doc_type_str = get_text(fields.doc_type);
    let doc_type = DocType::parse(&doc_type_str)
        .ok_or_else(|| SearchError::Query(format!("Invalid doc_type: {doc_type_str}")))?;

    Ok(SearchResult {
        doc_type,
        slug: get_text(fields.slug),
        title: get_text(fields.title),
        description: get_text(fields.description),
        image_url: non_empty(get_text(fields.image_url)),
        price: non_empty(get_text(fields.price)),
        price_cents: get_u64(fields.price_cents).filter(|c| *c > 0),
        available: get_u64(fields.available).is_some_and(|v| v == 1),
        score,
    })
}

struct Facets {
    total: usize,
    in_stock: usize,
    min_price: u64,
    max_price: u64,
}

impl Facets {
    fn from_results(results: &[SearchResult]) -> Self {
        let prices = results.iter().filter_map(|r| r.price_cents);
        Self {
            total: results.len(),
            in_stock: results.iter().filter(|r| r.available).count(),
            min_price: prices.clone().min().unwrap_or(0),
            max_price: prices.max().unwrap_or(0),
        }
    }
}

/// Search filters.
#[derive(Debug, Default, Clone)]
pub struct SearchFilters {
    /// `Some(true)` for in-stock only, `Some(false)` for sold-out only.
    pub available: Option<bool>,
    /// Minimum price in cents (inclusive)
    pub min_price_cents: Option<u64>,
    /// Maximum price in cents (inclusive)
    pub max_price_cents: Option<u64>,
}

impl SearchFilters {
    /// Read the filters from query-string values; unparseable ones are ignored.
    #[must_use]
    pub fn from_params(availability: Option<&str>, min: Option<&str>, max: Option<&str>) -> Self {
        let euros = |raw: Option<&str>| {
            raw.map(|s| s.trim().replace(',', "."))
                .and_then(|s| s.parse::<Decimal>().ok())
                .filter(|d| !d.is_sign_negative())
                .map(price_cents)
        };
        Self {
            available: match availability {
                Some("in_stock") => Some(true),
                Some("out_of_stock") => Some(false),
                _ => None,
            },
            min_price_cents: euros(min),
            max_price_cents: euros(max),
        }
    }
}

/// Search sort order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SearchSort {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
}

impl SearchSort {
    /// Parse from URL parameter value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            _ => Self::Relevance,
        }
    }

    /// Convert to URL parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
        }
    }
}

/// Grouped search results.
#[derive(Debug, Default)]
pub struct SearchResults {
    pub products: Vec<SearchResult>,
    pub categories: Vec<SearchResult>,
    pub combos: Vec<SearchResult>,
    pub query: String,
    /// Matching products before filters and limit
    pub total_count: usize,
    pub in_stock_count: usize,
    pub out_of_stock_count: usize,
    pub min_price_cents: u64,
    pub max_price_cents: u64,
}

impl SearchResults {
    /// Check if there are any results.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.products.is_empty() && self.categories.is_empty() && self.combos.is_empty()
    }

    /// Get the total number of results.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.products.len() + self.categories.len() + self.combos.len()
    }
}

/// Search errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Index error: {0}")]
    Index(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Build error: {0}")]
    Build(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn doc(doc_type: DocType, slug: &str, title: &str, cents: Option<i64>, available: bool) -> SearchDocument {
        SearchDocument {
            doc_type,
            slug: slug.to_owned(),
            title: title.to_owned(),
            description: format!("{title} description"),
            image_url: None,
            price: cents.map(|c| Decimal::new(c, 2)),
            available,
            tags: String::new(),
        }
    }

    fn index() -> SearchIndex {
        let index = SearchIndex::new();
        index
            .replace(&[
                doc(DocType::Product, "linnen-shirt", "Linnen shirt", Some(4500), true),
                doc(DocType::Product, "katoenen-shirt", "Katoenen shirt", Some(2500), false),
                doc(DocType::Product, "wollen-trui", "Wollen trui", Some(8900), true),
                doc(DocType::Category, "shirts", "Shirts", None, true),
                doc(DocType::Combo, "zomerset", "Zomerset shirt en broek", Some(6000), true),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = SearchIndex::new();
        assert!(!index.is_ready());
        let results = index
            .search_filtered("shirt", &SearchFilters::default(), SearchSort::Relevance, 10)
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(results.query, "shirt");
    }

    #[test]
    fn test_replace_makes_index_ready() {
        let index = index();
        assert!(index.is_ready());
        assert_eq!(index.num_docs(), 5);
    }

    #[test]
    fn test_search_groups_by_type() {
        let results = index()
            .search_filtered("shirt", &SearchFilters::default(), SearchSort::Relevance, 10)
            .unwrap();
        assert_eq!(results.products.len(), 2);
        assert_eq!(results.categories.len(), 1);
        assert_eq!(results.combos.len(), 1);
        assert_eq!(results.total_count, 2);
        assert_eq!(results.in_stock_count, 1);
        assert_eq!(results.min_price_cents, 2500);
        assert_eq!(results.max_price_cents, 4500);
    }

    #[test]
    fn test_stemming_and_fuzzy_match() {
        let index = index();
        let plural = index
            .search_filtered("shirts", &SearchFilters::default(), SearchSort::Relevance, 10)
            .unwrap();
        assert_eq!(plural.products.len(), 2);

        let typo = index
            .search_filtered("wolen", &SearchFilters::default(), SearchSort::Relevance, 10)
            .unwrap();
        assert_eq!(typo.products[0].slug, "wollen-trui");
    }

    #[test]
    fn test_availability_and_price_filters() {
        let index = index();
        let in_stock = SearchFilters {
            available: Some(true),
            ..Default::default()
        };
        let results = index
            .search_filtered("shirt", &in_stock, SearchSort::Relevance, 10)
            .unwrap();
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.products[0].slug, "linnen-shirt");

        let cheap = SearchFilters::from_params(None, None, Some("30"));
        let results = index
            .search_filtered("", &cheap, SearchSort::Relevance, 10)
            .unwrap();
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.products[0].slug, "katoenen-shirt");
    }

    #[test]
    fn test_price_sort() {
        let results = index()
            .search_filtered("", &SearchFilters::default(), SearchSort::PriceDesc, 10)
            .unwrap();
        let slugs: Vec<_> = results.products.iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(slugs, ["wollen-trui", "linnen-shirt", "katoenen-shirt"]);
        assert_eq!(results.products[0].price.as_deref(), Some("€89.00"));
    }

    #[test]
    fn test_suggest_prefix() {
        let results = index().suggest("wo", 5).unwrap();
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.products[0].url(), "/products/wollen-trui");
    }

    #[test]
    fn test_filters_from_params() {
        let filters = SearchFilters::from_params(Some("in_stock"), Some("10,50"), Some("-1"));
        assert_eq!(filters.available, Some(true));
        assert_eq!(filters.min_price_cents, Some(1050));
        assert_eq!(filters.max_price_cents, None);
        assert_eq!(SearchFilters::from_params(Some("all"), None, None).available, None);
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!(SearchSort::parse("price_asc"), SearchSort::PriceAsc);
        assert_eq!(SearchSort::parse("bogus"), SearchSort::Relevance);
        assert_eq!(SearchSort::PriceDesc.as_str(), "price_desc");
    }
}
