use shared::{LineItemDto, VoucherSubmissionRequest};
use std::collections::BTreeMap;

use crate::backend::domain::denomination_ledger::DenominationLedger;
use crate::backend::domain::line_item_table::LineItemTable;
use crate::backend::domain::models::LineItem;
use crate::backend::domain::voucher_layout::VoucherKind;
use crate::backend::io::mappers::DrawerMapper;

/// Everything a submission carries besides the ledger and the table
pub struct VoucherEnvelope<'a> {
    pub client_reference: &'a str,
    pub kind: VoucherKind,
    pub voucher_no: Option<&'a str>,
    pub company_id: &'a str,
    pub total_amount: i64,
    pub header: &'a BTreeMap<String, String>,
}

pub struct VoucherMapper;

impl VoucherMapper {
    /// Build the submission payload. Only rows with their required column
    /// filled are sent.
    pub fn to_submission(
        envelope: VoucherEnvelope<'_>,
        ledger: &DenominationLedger,
        table: &LineItemTable,
    ) -> VoucherSubmissionRequest {
        VoucherSubmissionRequest {
            client_reference: envelope.client_reference.to_string(),
            voucher_kind: envelope.kind.as_str().to_string(),
            voucher_no: envelope.voucher_no.map(str::to_string),
            company_id: envelope.company_id.to_string(),
            total_amount: envelope.total_amount,
            header: envelope.header.clone(),
            collect: DrawerMapper::counts_to_dto(&ledger.collect_counts()),
            issue: DrawerMapper::counts_to_dto(&ledger.issue_counts()),
            line_items: table
                .committed_rows()
                .enumerate()
                .map(|(index, row)| Self::line_to_dto(index + 1, row))
                .collect(),
        }
    }

    /// Rows of a source document, ready for `LineItemTable::insert_source_rows`
    pub fn to_source_rows(dtos: &[LineItemDto]) -> Vec<BTreeMap<String, String>> {
        dtos.iter().map(|dto| dto.values.clone()).collect()
    }

    fn line_to_dto(sequence: usize, row: &LineItem) -> LineItemDto {
        LineItemDto {
            sequence,
            values: row.values().clone(),
            read_only: row.read_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::{CountField, Denomination};
    use crate::backend::domain::voucher_layout::VoucherLayout;
    use std::sync::Arc;

    #[test]
    fn test_submission_skips_incomplete_rows_and_renumbers() {
        let layout = Arc::new(VoucherLayout::for_kind(VoucherKind::SalesReturn));
        let mut table = LineItemTable::new(layout);
        table.update_field(1, "item_code", "A1").unwrap();
        let second = table.add_row();
        table.update_field(second, "item_name", "Cotton Shirt").unwrap();

        let mut ledger = DenominationLedger::new();
        ledger.set_count(Denomination::R500, CountField::Collect, "2").unwrap();
        ledger.set_count(Denomination::R100, CountField::Issue, "1").unwrap();

        let mut header = BTreeMap::new();
        header.insert("customer_name".to_string(), "Ravi".to_string());

        let request = VoucherMapper::to_submission(
            VoucherEnvelope {
                client_reference: "voucher::SalesReturn::1",
                kind: VoucherKind::SalesReturn,
                voucher_no: None,
                company_id: "C01",
                total_amount: 900,
                header: &header,
            },
            &ledger,
            &table,
        );

        assert_eq!(request.voucher_kind, "SalesReturn");
        assert_eq!(request.collect.r500, 2);
        assert_eq!(request.issue.r100, 1);
        assert_eq!(request.line_items.len(), 1);
        assert_eq!(request.line_items[0].sequence, 1);
        assert_eq!(request.line_items[0].values["item_name"], "Cotton Shirt");
        assert_eq!(request.header["customer_name"], "Ravi");
    }
}
