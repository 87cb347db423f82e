pub mod drawer_mapper;
pub mod voucher_mapper;

pub use drawer_mapper::DrawerMapper;
pub use voucher_mapper::{VoucherEnvelope, VoucherMapper};
