//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. Setup failures panic; these
//! helpers are for tests only.

use std::sync::Arc;

use collectives::{Collectives, CollectivesConfig};
use collectives_core::{Collective, MemberId, Page, PageId, ShareToken};
use collectives_perms::{RequestContext, SessionAuthenticator, StaticMemberDirectory};
use collectives_store::{MemoryTokenStore, TokenStore};

/// Member that owns every seeded collective.
pub const MEMBER: &str = "bob";

/// Session id under which [`MEMBER`] is logged in.
pub const MEMBER_SESSION: &str = "session-bob";

/// Content of "Day 2" in "Our Garden".
pub const DAY_2_CONTENT: &str = "A test string with Day 2 in the middle and a \
    [link to Day 1](/index.php/apps/collectives/Our%20Garden/Day%201).";

/// A collectives service with one logged-in member.
pub struct TestFixture<S: TokenStore = MemoryTokenStore> {
    pub app: Collectives<S>,
    pub auth: Arc<SessionAuthenticator>,
    pub directory: Arc<StaticMemberDirectory>,
}

/// The seeded "Our Garden" collective.
#[derive(Debug, Clone)]
pub struct OurGarden {
    pub collective: Collective,
    pub day1: Page,
    pub day2: Page,
    pub table_of_contents: Page,
}

impl TestFixture<MemoryTokenStore> {
    /// Fixture over an in-memory token store and the default config.
    pub fn new() -> Self {
        Self::with_store(MemoryTokenStore::new(), CollectivesConfig::default())
    }

    pub fn with_config(config: CollectivesConfig) -> Self {
        Self::with_store(MemoryTokenStore::new(), config)
    }
}

impl Default for TestFixture<MemoryTokenStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TokenStore> TestFixture<S> {
    /// Fixture over the given token store.
    pub fn with_store(store: S, config: CollectivesConfig) -> Self {
        let auth = Arc::new(SessionAuthenticator::new());
        auth.login(MEMBER_SESSION, MemberId::new(MEMBER))
            .expect("login member");
        let directory = Arc::new(StaticMemberDirectory::new());
        let app = Collectives::new(store, auth.clone(), directory.clone(), config)
            .expect("valid fixture config");

        Self {
            app,
            auth,
            directory,
        }
    }

    /// Credentials of the member.
    pub fn member(&self) -> RequestContext {
        RequestContext::with_session(MEMBER_SESSION)
    }

    /// Credentials of an anonymous visitor holding a share link.
    pub fn visitor(&self, token: &ShareToken) -> RequestContext {
        RequestContext::with_share_token(token.to_hex())
    }

    /// Create a collective owned by the member.
    pub fn seed_collective(&self, title: &str) -> Collective {
        let collective = self.app.create_collective(title).expect("create collective");
        self.directory
            .add_member(collective.id, MemberId::new(MEMBER))
            .expect("add member");
        collective
    }

    /// Create a page directly in the index.
    pub fn seed_page(&self, collective: &Collective, parent: PageId, title: &str, content: &str) -> Page {
        self.app
            .index()
            .create_page(collective.id, parent, title, content)
            .expect("create page")
    }

    /// The "Share me" collective: only its welcome page.
    pub fn share_me(&self) -> Collective {
        self.seed_collective("Share me")
    }

    /// The "Our Garden" collective: "Day 1", "Day 2" linking to "Day 1",
    /// and "TableOfContents" with one second-level heading.
    pub fn our_garden(&self) -> OurGarden {
        let collective = self.seed_collective("Our Garden");
        let root = collective.root_page_id;

        let day1 = self.seed_page(&collective, root, "Day 1", "");
        let table_of_contents =
            self.seed_page(&collective, root, "TableOfContents", "## Second-Level Heading");
        let day2 = self.seed_page(&collective, root, "Day 2", DAY_2_CONTENT);

        OurGarden {
            collective,
            day1,
            day2,
            table_of_contents,
        }
    }
}
