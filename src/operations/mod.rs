pub mod op_helper;
pub mod credentials_op;
pub mod connection_op;
pub mod fetch_op;
pub mod camera_edit_op;
pub mod bridge_op;
