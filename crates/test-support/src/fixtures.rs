//! Decision service `OpenAPI` documents used across tests.

use serde_json::{Value, json};

pub const LOAN_APPROVAL_SERVICE_ID: &str = "test/loan_approval/loanApprovalDecisionService/3";
pub const LOAN_APPROVAL_DECISION_ID: &str = "loan_approval-3.0.0-2024-05-02T09:52:33.123Z";
pub const LOAN_APPROVAL_TOOL_NAME: &str = "Loan_Approval_approval";

/// Loan approval service with one `approval` operation. `Borrower.spouse` refers back to
/// `Borrower`.
#[must_use]
pub fn loan_approval_openapi() -> Value {
    json!({
        "openapi": "3.0.1",
        "info": {
            "title": "Loan Approval Decision Service",
            "version": "3.0.0",
            "x-ibm-ads-decision-service-id": LOAN_APPROVAL_SERVICE_ID,
            "x-ibm-ads-decision-service-name": "Loan Approval",
            "x-ibm-ads-decision-id": LOAN_APPROVAL_DECISION_ID
        },
        "paths": {
            "/approval/execute": {
                "post": {
                    "operationId": "approval",
                    "summary": "approval",
                    "description": "Execute the approval decision operation",
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/approvalInput" }
                            }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "Decision output",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/approvalOutput" }
                                }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "approvalInput": {
                    "type": "object",
                    "required": ["loan", "borrower"],
                    "properties": {
                        "loan": { "$ref": "#/components/schemas/Loan" },
                        "borrower": { "$ref": "#/components/schemas/Borrower" }
                    }
                },
                "approvalOutput": {
                    "type": "object",
                    "properties": {
                        "approved": { "type": "boolean" },
                        "message": { "type": "string" }
                    }
                },
                "Loan": {
                    "type": "object",
                    "properties": {
                        "amount": { "type": "number", "minimum": 0 },
                        "duration": { "type": "integer" },
                        "startDate": { "type": "string", "format": "date-time" }
                    }
                },
                "Borrower": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "creditScore": { "type": "integer" },
                        "spouse": { "$ref": "#/components/schemas/Borrower" }
                    }
                }
            }
        }
    })
}

/// A minimal service exposing `operation_ids`, each taking `{ "value": string }`.
#[must_use]
pub fn simple_service_openapi(display_name: &str, operation_ids: &[&str]) -> Value {
    let mut paths = serde_json::Map::new();
    for op in operation_ids {
        paths.insert(
            format!("/{op}/execute"),
            json!({
                "post": {
                    "operationId": op,
                    "summary": op,
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "properties": { "value": { "type": "string" } }
                                }
                            }
                        }
                    }
                }
            }),
        );
    }
    json!({
        "openapi": "3.0.1",
        "info": {
            "title": display_name,
            "version": "1.0.0",
            "x-ibm-ads-decision-service-name": display_name
        },
        "paths": paths
    })
}
