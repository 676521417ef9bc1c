//! Request/response shapes of the status and order lookup actions

use convergent_domain::{
    AsyncHandle, ConvergeError, OrderRef, OrderResolution, Result, StatusCode, StatusReport,
};
use serde_json::{json, Map, Value};

/// How a remote service exposes task status and order resolution
pub trait TaskProtocol: Send + Sync {
    /// Action that reports a task's status
    fn status_action(&self) -> &str;

    /// Request for the status of `handle`
    fn status_request(&self, handle: &AsyncHandle) -> Value;

    /// Status code and trace id from a status response
    fn read_status(&self, response: &Value) -> Result<StatusReport>;

    /// Action that resolves orders to resources
    fn order_action(&self) -> &str;

    /// Request resolving `order`
    fn order_request(&self, order: &OrderRef) -> Value;

    /// One entry per order found in the response
    fn read_orders(&self, response: &Value) -> Result<Vec<OrderResolution>>;
}

/// [`TaskProtocol`] over JSON payloads, addressed by field names and JSON
/// pointers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonTaskProtocol {
    pub status_action: String,
    /// Request field carrying the handle
    pub handle_field: String,
    /// Send the handle as a JSON number when it parses as one
    pub numeric_handle: bool,
    /// Pointer to the status code in the status response
    pub status_pointer: String,
    /// Pointer to the request-trace id, in any response
    pub request_id_pointer: String,
    pub order_action: String,
    /// Request field carrying the list of order references
    pub order_field: String,
    /// Pointer to the array of orders in the order response
    pub orders_pointer: String,
    /// Field of each order listing created resource ids
    pub resource_ids_field: String,
    /// Field of each order carrying the provisioning task handle
    pub order_handle_field: String,
}

impl JsonTaskProtocol {
    /// Flow-status convention: `DescribeFlowStatus` by numeric `FlowId`,
    /// orders resolved through `DescribeOrders`
    pub fn flow_default() -> Self {
        Self {
            status_action: "DescribeFlowStatus".into(),
            handle_field: "FlowId".into(),
            numeric_handle: true,
            status_pointer: "/Status".into(),
            request_id_pointer: "/RequestId".into(),
            order_action: "DescribeOrders".into(),
            order_field: "DealNames".into(),
            orders_pointer: "/Deals".into(),
            resource_ids_field: "InstanceIdSet".into(),
            order_handle_field: "FlowId".into(),
        }
    }

    /// Same conventions with a different status action and handle field
    pub fn with_status(mut self, action: impl Into<String>, handle_field: impl Into<String>) -> Self {
        self.status_action = action.into();
        self.handle_field = handle_field.into();
        self
    }

    fn request_id(&self, response: &Value) -> Option<String> {
        response.pointer(&self.request_id_pointer).and_then(Value::as_str).map(str::to_string)
    }

    fn read_handle(value: &Value) -> Option<AsyncHandle> {
        match value {
            Value::Number(n) => n.as_i64().map(AsyncHandle::from),
            Value::String(s) => Some(AsyncHandle::new(s.as_str())),
            _ => None,
        }
    }
}

impl TaskProtocol for JsonTaskProtocol {
    fn status_action(&self) -> &str {
        &self.status_action
    }

    fn status_request(&self, handle: &AsyncHandle) -> Value {
        let value = match handle.as_str().parse::<i64>() {
            Ok(number) if self.numeric_handle => json!(number),
            _ => json!(handle.as_str()),
        };
        let mut request = Map::new();
        request.insert(self.handle_field.clone(), value);
        Value::Object(request)
    }

    fn read_status(&self, response: &Value) -> Result<StatusReport> {
        let code = match response.pointer(&self.status_pointer) {
            Some(Value::Number(n)) => n.as_i64().map(StatusCode::Int),
            Some(Value::String(s)) => Some(StatusCode::Text(s.clone())),
            _ => None,
        }
        .ok_or_else(|| {
            ConvergeError::contract(
                &self.status_action,
                format!("no status code at {}", self.status_pointer),
            )
        })?;

        Ok(StatusReport { code, request_id: self.request_id(response) })
    }

    fn order_action(&self) -> &str {
        &self.order_action
    }

    fn order_request(&self, order: &OrderRef) -> Value {
        let mut request = Map::new();
        request.insert(self.order_field.clone(), json!([order.as_str()]));
        Value::Object(request)
    }

    fn read_orders(&self, response: &Value) -> Result<Vec<OrderResolution>> {
        let orders = response
            .pointer(&self.orders_pointer)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ConvergeError::contract(
                    &self.order_action,
                    format!("no order list at {}", self.orders_pointer),
                )
            })?;

        Ok(orders
            .iter()
            .map(|order| OrderResolution {
                resource_ids: order
                    .get(&self.resource_ids_field)
                    .and_then(Value::as_array)
                    .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default(),
                handle: order.get(&self.order_handle_field).and_then(Self::read_handle),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_request_uses_numeric_handle() {
        let protocol = JsonTaskProtocol::flow_default();
        assert_eq!(protocol.status_request(&AsyncHandle::from(42_i64)), json!({"FlowId": 42}));

        let textual = JsonTaskProtocol { numeric_handle: false, ..JsonTaskProtocol::flow_default() }
            .with_status("DescribeTasks", "TaskId");
        assert_eq!(textual.status_request(&AsyncHandle::from(7_i64)), json!({"TaskId": "7"}));
    }

    #[test]
    fn test_read_status() {
        let protocol = JsonTaskProtocol::flow_default();
        let report = protocol.read_status(&json!({"Status": 2, "RequestId": "req-1"})).unwrap();
        assert_eq!(report, StatusReport::new(2_i64).with_request_id("req-1"));

        let err = protocol.read_status(&json!({"RequestId": "req-1"})).unwrap_err();
        assert!(matches!(err, ConvergeError::ContractViolation { .. }));
    }

    #[test]
    fn test_read_orders() {
        let protocol = JsonTaskProtocol::flow_default();
        assert_eq!(
            protocol.order_request(&OrderRef::new("deal-1")),
            json!({"DealNames": ["deal-1"]})
        );

        let orders = protocol
            .read_orders(&json!({
                "Deals": [{"DealName": "deal-1", "InstanceIdSet": ["cdb-1"], "FlowId": 88}],
                "RequestId": "req-2"
            }))
            .unwrap();
        assert_eq!(
            orders,
            vec![OrderResolution {
                resource_ids: vec!["cdb-1".into()],
                handle: Some(AsyncHandle::from(88_i64)),
            }]
        );

        assert!(protocol.read_orders(&json!({"RequestId": "req-3"})).is_err());
    }
}
