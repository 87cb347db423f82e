use chrono::NaiveDate;
use shared::{DenominationMap, DrawerSnapshotRequest, DrawerSnapshotResponse};

use crate::backend::domain::models::DenominationCounts;

pub struct DrawerMapper;

impl DrawerMapper {
    pub fn to_request(date: NaiveDate, company_id: &str) -> DrawerSnapshotRequest {
        DrawerSnapshotRequest {
            date,
            company_id: company_id.to_string(),
        }
    }

    pub fn to_domain(dto: &DrawerSnapshotResponse) -> DenominationCounts {
        Self::counts_to_domain(&dto.counts)
    }

    pub fn counts_to_domain(dto: &DenominationMap) -> DenominationCounts {
        DenominationCounts::from_array(dto.to_array())
    }

    pub fn counts_to_dto(domain: &DenominationCounts) -> DenominationMap {
        DenominationMap::from_array(domain.to_array())
    }
}
