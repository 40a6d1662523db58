//! Radial bases for the optimized breakup.

mod lpqhi;
mod quadrature;

pub use lpqhi::LpqhiBasis;
pub use quadrature::GaussLegendre;
