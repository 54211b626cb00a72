//! Классификация клиента по истории покупок.
//!
//! Состояние клиента сворачивается по его продажам в хронологическом
//! порядке. Каждая продажа получает снимок классификации на момент записи.

use chrono::{Datelike, NaiveDate};
use contracts::domain::a001_client::aggregate::{Client, ClientId, CustomerType};
use contracts::domain::a003_sale::aggregate::MoveType;
use std::collections::HashMap;

/// Порог по умолчанию: после такого перерыва клиент считается вернувшимся
pub const DEFAULT_RECOVERY_DAYS: i64 = 180;

/// Состояние клиента, которое несет свертка
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientState {
    pub customer_type: CustomerType,
    pub transaction_count: i64,
    /// Дата последней обработанной продажи, включая кредитные ноты
    pub last_sale_date: Option<NaiveDate>,
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

impl ClientState {
    pub fn from_client(client: &Client, last_sale_date: Option<NaiveDate>) -> Self {
        Self {
            customer_type: client.customer_type,
            transaction_count: client.transaction_count,
            last_sale_date,
        }
    }

    /// Применить одну продажу и вернуть новую классификацию.
    ///
    /// Счет увеличивает счетчик транзакций, кредитная нота нет, но обе
    /// проходят одни и те же правила и сдвигают дату последней продажи.
    pub fn apply(&mut self, date: NaiveDate, move_type: MoveType, recovery_days: i64) -> CustomerType {
        if move_type == MoveType::Invoice {
            self.transaction_count += 1;
        }

        let next = if self.transaction_count < 2 {
            CustomerType::NewCustomer
        } else {
            match self.last_sale_date {
                None => self.customer_type,
                Some(prior) => {
                    let delta_days = (date - prior).num_days();
                    let current = self.customer_type;
                    if current == CustomerType::NewCustomer && same_month(date, prior) {
                        CustomerType::NewCustomer
                    } else if delta_days > recovery_days {
                        CustomerType::Recovered
                    } else if current == CustomerType::Recovered && same_month(date, prior) {
                        CustomerType::Recovered
                    } else {
                        CustomerType::Portfolio
                    }
                }
            }
        };

        self.customer_type = next;
        self.last_sale_date = Some(date);
        next
    }
}

/// Продажа как событие свертки
#[derive(Debug, Clone, Copy)]
pub struct SaleEvent<'a> {
    pub code: &'a str,
    pub client_id: ClientId,
    pub date: NaiveDate,
    pub move_type: MoveType,
}

/// Упорядочить события: по клиенту, затем по дате и коду
pub fn sort_events(events: &mut [SaleEvent<'_>]) {
    events.sort_by(|a, b| {
        (a.client_id, a.date, a.code).cmp(&(b.client_id, b.date, b.code))
    });
}

/// Свернуть события в состояния клиентов.
///
/// События клиентов, которых нет в `states`, пропускаются. Возвращает
/// снимок классификации по коду продажи.
pub fn fold_history<'a>(
    states: &mut HashMap<ClientId, ClientState>,
    events: &[SaleEvent<'a>],
    recovery_days: i64,
) -> HashMap<&'a str, CustomerType> {
    let mut snapshots = HashMap::with_capacity(events.len());
    for event in events {
        let Some(state) = states.get_mut(&event.client_id) else {
            tracing::warn!("No state for client {} of sale {}", event.client_id, event.code);
            continue;
        };
        let customer_type = state.apply(event.date, event.move_type, recovery_days);
        tracing::debug!(
            "Sale {} of client {}: {} (count {})",
            event.code,
            event.client_id,
            customer_type.label(),
            state.transaction_count
        );
        snapshots.insert(event.code, customer_type);
    }
    snapshots
}
