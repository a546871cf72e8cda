//! Exchange-facing descriptors and the sizing rules a reactor uses to build
//! them.
//!
//! The exchange owns matching. A reactor only describes what it wants
//! ([`RequestPortfolio`]) and what it can offer ([`BidPortfolio`]), then
//! consumes the [`Trade`]s the exchange settles on.

use crate::config::MaterialStream;
use crate::fixed::{EPSILON, Quantity};
use crate::id::{Commodity, RequestId};
use crate::material::{Material, MaterialError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound on the total quantity matched against a portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityConstraint {
    pub capacity: Quantity,
}

/// A request for material on a commodity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub commodity: Commodity,
    /// Desired material: quantity and composition.
    pub target: Material,
}

/// A request as posted on the exchange, carrying the exchange's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedRequest {
    pub id: RequestId,
    pub request: Request,
}

/// Requests the exchange has open, grouped by commodity.
pub type CommodityRequests = BTreeMap<Commodity, Vec<PostedRequest>>;

/// Requests plus the constraints that bind them together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPortfolio {
    pub requests: Vec<Request>,
    pub constraints: Vec<CapacityConstraint>,
}

/// An offer to fill a posted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub request: RequestId,
    pub offer: Material,
}

/// Bids plus the constraints shared across them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidPortfolio {
    pub bids: Vec<Bid>,
    pub constraints: Vec<CapacityConstraint>,
}

/// A matched transfer settled by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub request: RequestId,
    pub commodity: Commodity,
    pub amount: Quantity,
}

/// Quantity needed to bring `held` up to `target`, or `None` when the gap
/// is negligible or negative.
pub fn order_size(target: Quantity, held: Quantity) -> Option<Quantity> {
    let gap = target.saturating_sub(held);
    (gap > EPSILON).then_some(gap)
}

/// A single-request portfolio for `size` of the input stream, capped at
/// `size` so over-delivery is never accepted.
pub fn request_portfolio(stream: &MaterialStream, size: Quantity) -> Result<RequestPortfolio, MaterialError> {
    let target = Material::new(size, stream.recipe.clone())?;
    Ok(RequestPortfolio {
        requests: vec![Request {
            commodity: stream.commodity.clone(),
            target,
        }],
        constraints: vec![CapacityConstraint { capacity: size }],
    })
}

/// Bid on every request strictly smaller than `available`, offering exactly
/// the requested quantity of the output stream. One shared constraint caps
/// the total at `available`.
pub fn bid_portfolio(
    requests: &[PostedRequest],
    stream: &MaterialStream,
    available: Quantity,
) -> Result<BidPortfolio, MaterialError> {
    let mut bids = Vec::new();
    for posted in requests {
        let qty = posted.request.target.quantity();
        if qty < available {
            bids.push(Bid {
                request: posted.id,
                offer: Material::new(qty, stream.recipe.clone())?,
            });
        }
    }
    Ok(BidPortfolio {
        bids,
        constraints: vec![CapacityConstraint { capacity: available }],
    })
}

/// Merge materials into one. Returns `None` for an empty input.
pub fn merge_materials(
    materials: impl IntoIterator<Item = Material>,
) -> Result<Option<Material>, MaterialError> {
    let mut iter = materials.into_iter();
    let Some(mut merged) = iter.next() else {
        return Ok(None);
    };
    for mat in iter {
        merged.absorb(mat)?;
    }
    Ok(Some(merged))
}
