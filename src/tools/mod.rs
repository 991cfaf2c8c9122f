pub mod arxiv;
pub mod fetcher;
pub mod pubmed;
pub mod search;
pub mod unpaywall;
pub mod zotero;

pub use arxiv::ArxivClient;
pub use fetcher::{HttpFetcher, PaperFetcher};
pub use pubmed::PubmedClient;
pub use search::{SearchBackend, SearchDocument, SearchResponse};
pub use unpaywall::{DoiResolver, OpenAccessStatus, UnpaywallClient};
pub use zotero::{Citation, NoopReferenceManager, ReferenceManager, RegistrationOutcome, ZoteroClient};
