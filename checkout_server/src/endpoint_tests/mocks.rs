use checkout_engine::{
    db_types::{NewOrder, Order, SellerBinding},
    traits::{
        DirectoryError,
        IdempotencyKey,
        OrderQueryFilter,
        OrderRepository,
        OrderRepositoryError,
        PaymentIntent,
        PaymentIntentRequest,
        PaymentProvider,
        PaymentProviderError,
        ShopDirectory,
    },
};
use mockall::mock;

mock! {
    pub Shops {}
    impl Clone for Shops {
        fn clone(&self) -> Self;
    }
    impl ShopDirectory for Shops {
        async fn fetch_seller_bindings(&self, shop_ids: &[String]) -> Result<Vec<SellerBinding>, DirectoryError>;
    }
}

mock! {
    pub Provider {}
    impl Clone for Provider {
        fn clone(&self) -> Self;
    }
    impl PaymentProvider for Provider {
        async fn create_payment_intent(&self, request: PaymentIntentRequest) -> Result<PaymentIntent, PaymentProviderError>;
    }
}

mock! {
    pub ReportBackend {}
    impl Clone for ReportBackend {
        fn clone(&self) -> Self;
    }
    impl OrderRepository for ReportBackend {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderRepositoryError>;
        async fn find_recent_duplicate(&self, key: &IdempotencyKey) -> Result<Option<Order>, OrderRepositoryError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderRepositoryError>;
        async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderRepositoryError>;
    }
    impl ShopDirectory for ReportBackend {
        async fn fetch_seller_bindings(&self, shop_ids: &[String]) -> Result<Vec<SellerBinding>, DirectoryError>;
    }
}
