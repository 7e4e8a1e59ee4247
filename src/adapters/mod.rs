pub mod ethereum;
pub mod mock_registry;
pub mod mock_token;
