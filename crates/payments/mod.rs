pub mod callback_fields;
pub mod duitku_client;
pub mod factory;
pub mod gateway;
pub mod midtrans_client;
pub mod signatures;
pub mod status_mapper;
