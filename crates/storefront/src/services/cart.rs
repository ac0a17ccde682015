//! Cart store: session-local state mirrored to the durable cart table.
//!
//! Every mutation applies to the local cart first and persists the snapshot,
//! then performs the matching remote write. A failed remote write is logged
//! and reported but never rolls the local state back; the next
//! [`CartStore::fetch_cart`] reconciles the two.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;

use ahmed_mart_core::cart::{Cart, CartChange, CartItem};
use ahmed_mart_core::{ProductId, UserId};

use crate::db::{CartItemRepository, RepositoryError};
use crate::models::{CurrentUser, session_keys};

/// Errors from the local cart snapshot.
#[derive(Debug, Error)]
pub enum CartError {
    /// Reading or writing the session failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// What happened to the remote half of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSync {
    /// The remote table now matches.
    Synced,
    /// No remote write was needed or the shopper is signed out.
    Skipped,
    /// The remote write failed; local state was kept.
    Failed(String),
}

/// Storage for the serialized local cart.
#[allow(async_fn_in_trait)]
pub trait CartSnapshotStore {
    /// Load the snapshot, or an empty cart if none was saved.
    async fn load(&self) -> Result<Cart, CartError>;

    /// Persist the snapshot.
    async fn save(&self, cart: &Cart) -> Result<(), CartError>;
}

/// The remote per-user cart table.
#[allow(async_fn_in_trait)]
pub trait CartTable {
    async fn upsert(&self, product_id: ProductId, quantity: u32) -> Result<(), RepositoryError>;
    async fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError>;
    async fn delete(&self, product_id: ProductId) -> Result<(), RepositoryError>;
    async fn clear(&self) -> Result<(), RepositoryError>;
    async fn fetch(&self) -> Result<Vec<CartItem>, RepositoryError>;
}

/// Session-backed cart snapshot.
#[derive(Clone)]
pub struct SessionCartSnapshot {
    session: Session,
}

impl SessionCartSnapshot {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl CartSnapshotStore for SessionCartSnapshot {
    async fn load(&self) -> Result<Cart, CartError> {
        Ok(self
            .session
            .get::<Cart>(session_keys::CART)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartError> {
        self.session.insert(session_keys::CART, cart).await?;
        Ok(())
    }
}

/// `PostgreSQL` cart table scoped to one user.
pub struct PgCartTable<'a> {
    repo: CartItemRepository<'a>,
    user_id: UserId,
}

impl<'a> PgCartTable<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, user_id: UserId) -> Self {
        Self {
            repo: CartItemRepository::new(pool),
            user_id,
        }
    }
}

impl CartTable for PgCartTable<'_> {
    async fn upsert(&self, product_id: ProductId, quantity: u32) -> Result<(), RepositoryError> {
        self.repo.upsert(self.user_id, product_id, quantity).await
    }

    async fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        self.repo
            .set_quantity(self.user_id, product_id, quantity)
            .await
    }

    async fn delete(&self, product_id: ProductId) -> Result<(), RepositoryError> {
        self.repo.delete(self.user_id, product_id).await
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        self.repo.clear(self.user_id).await
    }

    async fn fetch(&self) -> Result<Vec<CartItem>, RepositoryError> {
        self.repo.fetch(self.user_id).await
    }
}

/// A cart with its local snapshot store and, when signed in, its remote table.
pub struct CartStore<L, R> {
    local: L,
    remote: Option<R>,
    cart: Cart,
}

impl<L: CartSnapshotStore, R: CartTable> CartStore<L, R> {
    /// Load the cart from its local snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the snapshot cannot be read.
    pub async fn load(local: L, remote: Option<R>) -> Result<Self, CartError> {
        let cart = local.load().await?;
        Ok(Self {
            local,
            remote,
            cart,
        })
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Whether mutations are mirrored remotely.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.remote.is_some()
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the local snapshot cannot be saved.
    pub async fn add_item(&mut self, item: CartItem) -> Result<RemoteSync, CartError> {
        let change = self.cart.add_item(item);
        self.apply(change).await
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the local snapshot cannot be saved.
    pub async fn remove_item(&mut self, product_id: ProductId) -> Result<RemoteSync, CartError> {
        let change = self.cart.remove_item(product_id);
        self.apply(change).await
    }

    /// Set a line's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the local snapshot cannot be saved.
    pub async fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<RemoteSync, CartError> {
        let change = self.cart.update_quantity(product_id, quantity);
        self.apply(change).await
    }

    /// # Errors
    ///
    /// Returns `CartError` if the local snapshot cannot be saved.
    pub async fn increment_quantity(
        &mut self,
        product_id: ProductId,
    ) -> Result<RemoteSync, CartError> {
        let change = self.cart.increment_quantity(product_id);
        self.apply(change).await
    }

    /// # Errors
    ///
    /// Returns `CartError` if the local snapshot cannot be saved.
    pub async fn decrement_quantity(
        &mut self,
        product_id: ProductId,
    ) -> Result<RemoteSync, CartError> {
        let change = self.cart.decrement_quantity(product_id);
        self.apply(change).await
    }

    /// Replace the local cart with the remote table's current contents.
    ///
    /// A failed fetch leaves the local cart untouched.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the local snapshot cannot be saved.
    pub async fn fetch_cart(&mut self) -> Result<RemoteSync, CartError> {
        let Some(remote) = &self.remote else {
            return Ok(RemoteSync::Skipped);
        };

        match remote.fetch().await {
            Ok(items) => {
                self.cart.replace_all(items);
                self.local.save(&self.cart).await?;
                Ok(RemoteSync::Synced)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch remote cart");
                Ok(RemoteSync::Failed(e.to_string()))
            }
        }
    }

    /// Empty the cart locally and remotely.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the local snapshot cannot be saved.
    pub async fn clear_cart(&mut self) -> Result<RemoteSync, CartError> {
        self.cart.clear();
        self.local.save(&self.cart).await?;

        let Some(remote) = &self.remote else {
            return Ok(RemoteSync::Skipped);
        };
        Ok(report(remote.clear().await))
    }

    async fn apply(&mut self, change: CartChange) -> Result<RemoteSync, CartError> {
        if change == CartChange::None {
            return Ok(RemoteSync::Skipped);
        }

        self.local.save(&self.cart).await?;

        let Some(remote) = &self.remote else {
            return Ok(RemoteSync::Skipped);
        };

        let result = match change {
            CartChange::None => return Ok(RemoteSync::Skipped),
            CartChange::Upsert {
                product_id,
                quantity,
            } => remote.upsert(product_id, quantity).await,
            CartChange::SetQuantity {
                product_id,
                quantity,
            } => remote.set_quantity(product_id, quantity).await,
            CartChange::Delete { product_id } => remote.delete(product_id).await,
        };

        Ok(report(result))
    }
}

fn report(result: Result<(), RepositoryError>) -> RemoteSync {
    match result {
        Ok(()) => RemoteSync::Synced,
        Err(e) => {
            tracing::warn!(error = %e, "Remote cart write failed; keeping local state");
            RemoteSync::Failed(e.to_string())
        }
    }
}

/// The cart store used by request handlers.
pub type SessionCartStore<'a> = CartStore<SessionCartSnapshot, PgCartTable<'a>>;

/// Open the request's cart, mirrored remotely when a user is signed in.
///
/// # Errors
///
/// Returns `CartError` if the session snapshot cannot be read.
pub async fn open<'a>(
    session: &Session,
    pool: &'a PgPool,
    user: Option<&CurrentUser>,
) -> Result<SessionCartStore<'a>, CartError> {
    CartStore::load(
        SessionCartSnapshot::new(session.clone()),
        user.map(|u| PgCartTable::new(pool, u.id)),
    )
    .await
}

/// Cart contents with derived totals, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total_items: u64,
    pub total_amount: Decimal,
    pub delivery_fee: Decimal,
    pub grand_total: Decimal,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let total_amount = cart.total_amount();
        let delivery_fee = cart.delivery_fee();
        Self {
            items: cart.items().to_vec(),
            total_items: cart.total_items(),
            total_amount,
            delivery_fee,
            grand_total: total_amount + delivery_fee,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// In-memory snapshot store.
    #[derive(Default)]
    pub(crate) struct MemorySnapshot {
        pub(crate) saved: Mutex<Option<Cart>>,
        pub(crate) fail_save: bool,
    }

    impl CartSnapshotStore for MemorySnapshot {
        async fn load(&self) -> Result<Cart, CartError> {
            Ok(self.saved.lock().unwrap().clone().unwrap_or_default())
        }

        async fn save(&self, cart: &Cart) -> Result<(), CartError> {
            if self.fail_save {
                return Err(CartError::Session(tower_sessions::session::Error::Store(
                    tower_sessions::session_store::Error::Backend("unavailable".to_string()),
                )));
            }
            *self.saved.lock().unwrap() = Some(cart.clone());
            Ok(())
        }
    }

    /// In-memory remote table that records writes and can be made to fail.
    #[derive(Default)]
    pub(crate) struct MemoryTable {
        pub(crate) rows: Mutex<Vec<CartItem>>,
        pub(crate) writes: Mutex<Vec<String>>,
        pub(crate) fail: bool,
    }

    impl MemoryTable {
        fn record(&self, write: String) -> Result<(), RepositoryError> {
            if self.fail {
                return Err(RepositoryError::DataCorruption("offline".to_string()));
            }
            self.writes.lock().unwrap().push(write);
            Ok(())
        }
    }

    impl CartTable for MemoryTable {
        async fn upsert(&self, product_id: ProductId, quantity: u32) -> Result<(), RepositoryError> {
            self.record(format!("upsert {product_id} {quantity}"))
        }

        async fn set_quantity(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> Result<(), RepositoryError> {
            self.record(format!("set {product_id} {quantity}"))
        }

        async fn delete(&self, product_id: ProductId) -> Result<(), RepositoryError> {
            self.record(format!("delete {product_id}"))
        }

        async fn clear(&self) -> Result<(), RepositoryError> {
            self.record("clear".to_string())
        }

        async fn fetch(&self) -> Result<Vec<CartItem>, RepositoryError> {
            self.record("fetch".to_string())?;
            Ok(self.rows.lock().unwrap().clone())
        }
    }

    pub(crate) fn item(price: i64, max_quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::generate(),
            name: "Basmati Rice".to_string(),
            image_url: None,
            unit_value: "5".to_string(),
            unit_type: "kg".to_string(),
            selling_price: Decimal::from(price),
            mrp: Decimal::from(price + 20),
            quantity: 1,
            max_quantity,
            vendor_id: None,
        }
    }

    async fn store(remote: Option<MemoryTable>) -> CartStore<MemorySnapshot, MemoryTable> {
        CartStore::load(MemorySnapshot::default(), remote)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_signed_out_mutations_stay_local() {
        let mut store = store(None).await;
        let rice = item(450, 3);

        let sync = store.add_item(rice.clone()).await.unwrap();
        assert_eq!(sync, RemoteSync::Skipped);
        assert_eq!(store.cart().item_quantity(rice.product_id), 1);

        let saved = store.local.saved.lock().unwrap().clone().unwrap();
        assert_eq!(saved.item_quantity(rice.product_id), 1);
        assert_eq!(store.fetch_cart().await.unwrap(), RemoteSync::Skipped);
    }

    #[tokio::test]
    async fn test_mutations_are_mirrored() {
        let mut store = store(Some(MemoryTable::default())).await;
        let rice = item(450, 3);
        let id = rice.product_id;

        store.add_item(rice.clone()).await.unwrap();
        store.add_item(rice).await.unwrap();
        store.update_quantity(id, 9).await.unwrap();
        store.decrement_quantity(id).await.unwrap();
        store.remove_item(id).await.unwrap();

        let writes = store.remote.as_ref().unwrap().writes.lock().unwrap().clone();
        assert_eq!(
            writes,
            vec![
                format!("upsert {id} 1"),
                format!("upsert {id} 2"),
                format!("set {id} 3"),
                format!("set {id} 2"),
                format!("delete {id}"),
            ]
        );
        assert!(store.cart().is_empty());
    }

    #[tokio::test]
    async fn test_increment_at_max_writes_nothing() {
        let mut store = store(Some(MemoryTable::default())).await;
        let oil = item(180, 1);
        store.add_item(oil.clone()).await.unwrap();

        let sync = store.increment_quantity(oil.product_id).await.unwrap();
        assert_eq!(sync, RemoteSync::Skipped);
        assert_eq!(store.remote.as_ref().unwrap().writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_local_state() {
        let table = MemoryTable {
            fail: true,
            ..Default::default()
        };
        let mut store = store(Some(table)).await;
        let rice = item(450, 3);

        let sync = store.add_item(rice.clone()).await.unwrap();
        assert!(matches!(sync, RemoteSync::Failed(_)));
        assert_eq!(store.cart().item_quantity(rice.product_id), 1);

        let sync = store.fetch_cart().await.unwrap();
        assert!(matches!(sync, RemoteSync::Failed(_)));
        assert_eq!(store.cart().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_replaces_local_cart() {
        let mut remote_line = item(90, 2);
        remote_line.quantity = 7;
        let table = MemoryTable {
            rows: Mutex::new(vec![remote_line.clone()]),
            ..Default::default()
        };
        let mut store = store(Some(table)).await;
        store.add_item(item(450, 3)).await.unwrap();

        assert_eq!(store.fetch_cart().await.unwrap(), RemoteSync::Synced);
        assert_eq!(store.cart().len(), 1);
        assert_eq!(store.cart().item_quantity(remote_line.product_id), 2);
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let mut store = store(Some(MemoryTable::default())).await;
        store.add_item(item(450, 3)).await.unwrap();

        assert_eq!(store.clear_cart().await.unwrap(), RemoteSync::Synced);
        assert!(store.cart().is_empty());
        assert!(store.local.saved.lock().unwrap().as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_cart_view_totals() {
        let mut cart = Cart::new();
        cart.add_item(item(100, 5));
        let view = CartView::from(&cart);
        assert_eq!(view.total_items, 1);
        assert_eq!(view.delivery_fee, Decimal::from(29));
        assert_eq!(view.grand_total, Decimal::from(129));
    }
}
