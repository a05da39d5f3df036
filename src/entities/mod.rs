pub mod document_number;
pub mod item;
pub mod item_image;
pub mod partner;
pub mod transaction;
pub mod transaction_item;
pub mod user;

pub use document_number::Entity as DocumentNumber;
pub use item::Entity as Item;
pub use item_image::Entity as ItemImage;
pub use partner::Entity as Partner;
pub use transaction::Entity as Transaction;
pub use transaction_item::Entity as TransactionItem;
pub use user::Entity as User;

pub use item::Model as ItemModel;
pub use item_image::Model as ItemImageModel;
pub use partner::Model as PartnerModel;
pub use transaction::Model as TransactionModel;
pub use transaction_item::Model as TransactionItemModel;
pub use user::Model as UserModel;
