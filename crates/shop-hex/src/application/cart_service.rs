use crate::errors::AppError;
use shop_types::domain::cart::CartItem;
use shop_types::domain::{ProductId, UserId};
use shop_types::ports::cart_repository::CartRepository;
use shop_types::ports::product_catalog::ProductCatalog;
use shop_types::ports::RepoError;

/// Cart lines per (user, product). The price is captured from the catalog on
/// the first add and kept for the life of the line.
pub struct CartService<C: CartRepository, P: ProductCatalog> {
    carts: C,
    catalog: P,
}

impl<C: CartRepository, P: ProductCatalog> CartService<C, P> {
    pub fn new(carts: C, catalog: P) -> Self {
        Self { carts, catalog }
    }

    /// Adds `quantity` of a product, merging into an existing line.
    ///
    /// The lookup and the write are not atomic. Two concurrent first adds of
    /// the same product race; the loser gets the store's conflict error.
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, AppError> {
        if quantity < 1 {
            return Err(AppError::InvalidQuantity(quantity));
        }
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or(AppError::ProductNotFound(product_id))?;

        match self
            .carts
            .get_by_user_and_product(user_id, product_id)
            .await?
        {
            Some(mut line) => {
                let current = line.quantity;
                line.add_quantity(quantity).ok_or(AppError::QuantityOverflow {
                    current,
                    added: quantity,
                })?;
                let line = self.carts.update(line).await?;
                tracing::debug!(user_id, product_id, quantity = line.quantity, "cart line merged");
                Ok(line)
            }
            None => {
                let line = CartItem::new(user_id, product_id, quantity, product.price);
                let line = self.carts.create(line).await?;
                tracing::debug!(user_id, product_id, quantity, "cart line created");
                Ok(line)
            }
        }
    }

    /// Overwrites the quantity of an existing line.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, AppError> {
        if quantity < 1 {
            return Err(AppError::InvalidQuantity(quantity));
        }
        let mut line = self
            .carts
            .get_by_user_and_product(user_id, product_id)
            .await?
            .ok_or(AppError::CartItemNotFound(product_id))?;
        line.set_quantity(quantity);
        match self.carts.update(line).await {
            Ok(line) => Ok(line),
            Err(RepoError::NotFound) => Err(AppError::CartItemNotFound(product_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Removing a line that does not exist is not an error.
    pub async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> Result<(), AppError> {
        let removed = self.carts.delete(user_id, product_id).await?;
        if removed {
            tracing::debug!(user_id, product_id, "cart line removed");
        }
        Ok(())
    }

    pub async fn get_items(&self, user_id: UserId) -> Result<Vec<CartItem>, AppError> {
        Ok(self.carts.get_by_user(user_id).await?)
    }

    pub async fn remove_all_items(&self, user_id: UserId) -> Result<u64, RepoError> {
        self.carts.delete_all_by_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shop_repo::memory::InMemoryStore;
    use shop_types::domain::product::Product;

    fn store_with_catalog() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_product(Product {
            id: 1,
            name: "Widget".into(),
            price: Decimal::new(1099, 2),
        });
        store.insert_product(Product {
            id: 2,
            name: "Gadget".into(),
            price: Decimal::new(2099, 2),
        });
        store
    }

    fn service(store: &InMemoryStore) -> CartService<InMemoryStore, InMemoryStore> {
        CartService::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn repeated_add_merges_and_keeps_first_price() {
        let store = store_with_catalog();
        let svc = service(&store);

        svc.add_item(1, 1, 3).await.unwrap();
        // Reprice after the first add; the line keeps its snapshot.
        store.insert_product(Product {
            id: 1,
            name: "Widget".into(),
            price: Decimal::new(1499, 2),
        });
        let merged = svc.add_item(1, 1, 2).await.unwrap();

        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.price, Decimal::new(1099, 2));
        assert_eq!(svc.get_items(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_overwrites_quantity() {
        let store = store_with_catalog();
        let svc = service(&store);

        svc.add_item(1, 1, 3).await.unwrap();
        let updated = svc.update_quantity(1, 1, 1).await.unwrap();
        assert_eq!(updated.quantity, 1);

        let missing = svc.update_quantity(1, 2, 1).await;
        assert!(matches!(missing, Err(AppError::CartItemNotFound(2))));
    }

    #[tokio::test]
    async fn quantity_below_one_is_rejected() {
        let store = store_with_catalog();
        let svc = service(&store);

        assert!(matches!(
            svc.add_item(1, 1, 0).await,
            Err(AppError::InvalidQuantity(0))
        ));
        svc.add_item(1, 1, 1).await.unwrap();
        assert!(matches!(
            svc.update_quantity(1, 1, -2).await,
            Err(AppError::InvalidQuantity(-2))
        ));
        assert!(svc.get_items(1).await.unwrap()[0].quantity == 1);
    }

    #[tokio::test]
    async fn merge_overflow_is_rejected_and_line_kept() {
        let store = store_with_catalog();
        let svc = service(&store);

        svc.add_item(1, 1, i32::MAX).await.unwrap();
        let res = svc.add_item(1, 1, 5).await;
        assert!(matches!(
            res,
            Err(AppError::QuantityOverflow {
                current: i32::MAX,
                added: 5,
            })
        ));
        assert_eq!(svc.get_items(1).await.unwrap()[0].quantity, i32::MAX);
    }

    #[tokio::test]
    async fn unknown_product_is_not_added() {
        let store = store_with_catalog();
        let svc = service(&store);

        let res = svc.add_item(1, 99, 1).await;
        assert!(matches!(res, Err(AppError::ProductNotFound(99))));
        assert!(svc.get_items(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_clear_is_per_user() {
        let store = store_with_catalog();
        let svc = service(&store);

        svc.add_item(1, 1, 1).await.unwrap();
        svc.add_item(1, 2, 1).await.unwrap();
        svc.add_item(2, 1, 1).await.unwrap();

        svc.remove_item(1, 1).await.unwrap();
        svc.remove_item(1, 1).await.unwrap();
        assert_eq!(svc.get_items(1).await.unwrap().len(), 1);

        assert_eq!(svc.remove_all_items(1).await.unwrap(), 1);
        assert!(svc.get_items(1).await.unwrap().is_empty());
        assert_eq!(svc.get_items(2).await.unwrap().len(), 1);
    }
}
