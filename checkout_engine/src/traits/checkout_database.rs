use crate::traits::{InventoryManagement, OrderRepository, ShopDirectory, UserDirectory};

/// Everything the reconciler needs from the durable backend. Any type that implements the individual traits gets this
/// for free.
pub trait CheckoutDatabase: OrderRepository + InventoryManagement + ShopDirectory + UserDirectory {}

impl<T> CheckoutDatabase for T where T: OrderRepository + InventoryManagement + ShopDirectory + UserDirectory {}
