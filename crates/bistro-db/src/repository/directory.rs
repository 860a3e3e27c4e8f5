//! # Directory Repository
//!
//! Employees, suppliers and customers: the people and businesses the engines
//! reference by id.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use bistro_core::validation::{validate_email, validate_name, validate_new_customer};
use bistro_core::{Customer, Employee, NewCustomer, NewEmployee, NewSupplier, Supplier};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;

#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: SqlitePool,
}

impl DirectoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DirectoryRepository { pool }
    }

    // =========================================================================
    // Employees
    // =========================================================================

    /// Creates an employee. Duplicate emails fail with `Conflict`.
    pub async fn create_employee(&self, input: &NewEmployee) -> DbResult<Employee> {
        validate_name("name", &input.name)?;
        validate_email(&input.email)?;

        let employee = Employee {
            id: new_id(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            role: input.role,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO employees (id, name, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&employee.id)
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(employee.role)
        .bind(employee.created_at)
        .execute(&self.pool)
        .await?;

        debug!(employee_id = %employee.id, role = ?employee.role, "Employee created");
        Ok(employee)
    }

    pub async fn get_employee(&self, id: &str) -> DbResult<Employee> {
        sqlx::query_as::<_, Employee>(
            "SELECT id, name, email, role, created_at FROM employees WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Employee", id))
    }

    pub async fn find_employee_by_email(&self, email: &str) -> DbResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT id, name, email, role, created_at FROM employees WHERE email = ?1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    pub(crate) async fn employee_exists_in(&self, uow: &mut UnitOfWork, id: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?1)")
            .bind(id)
            .fetch_one(uow.conn())
            .await?;
        Ok(exists)
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    pub async fn create_supplier(&self, input: &NewSupplier) -> DbResult<Supplier> {
        validate_name("name", &input.name)?;

        let supplier = Supplier {
            id: new_id(),
            name: input.name.trim().to_string(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO suppliers (id, name, phone, address, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;

        Ok(supplier)
    }

    pub async fn get_supplier(&self, id: &str) -> DbResult<Supplier> {
        sqlx::query_as::<_, Supplier>(
            "SELECT id, name, phone, address, created_at FROM suppliers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn list_suppliers(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, phone, address, created_at FROM suppliers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(suppliers)
    }

    pub(crate) async fn supplier_exists_in(&self, uow: &mut UnitOfWork, id: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = ?1)")
            .bind(id)
            .fetch_one(uow.conn())
            .await?;
        Ok(exists)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Creates a customer. A phone number already on file fails with `Conflict`.
    pub async fn create_customer(&self, input: &NewCustomer) -> DbResult<Customer> {
        validate_new_customer(input)?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let customer = insert_customer(uow.conn(), input).await?;
        uow.commit().await?;

        debug!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn get_customer(&self, id: &str) -> DbResult<Customer> {
        sqlx::query_as::<_, Customer>(
            "SELECT id, first_name, last_name, phone, created_at FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Customer", id))
    }

    pub async fn find_customer_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_customer_by_phone(&mut conn, phone).await
    }

    /// Returns the customer with this phone, creating one if none exists.
    ///
    /// An existing customer keeps the name on file.
    pub(crate) async fn find_or_create_customer(
        &self,
        uow: &mut UnitOfWork,
        input: &NewCustomer,
    ) -> DbResult<Customer> {
        if let Some(existing) = fetch_customer_by_phone(uow.conn(), &input.phone).await? {
            return Ok(existing);
        }
        insert_customer(uow.conn(), input).await
    }
}

async fn insert_customer(conn: &mut SqliteConnection, input: &NewCustomer) -> DbResult<Customer> {
    let customer = Customer {
        id: new_id(),
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        phone: input.phone.trim().to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO customers (id, first_name, last_name, phone, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.first_name)
    .bind(&customer.last_name)
    .bind(&customer.phone)
    .bind(customer.created_at)
    .execute(conn)
    .await?;

    Ok(customer)
}

async fn fetch_customer_by_phone(
    conn: &mut SqliteConnection,
    phone: &str,
) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, first_name, last_name, phone, created_at FROM customers WHERE phone = ?1",
    )
    .bind(phone.trim())
    .fetch_optional(conn)
    .await?;
    Ok(customer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bistro_core::{EmployeeRole, ErrorKind};

    fn guest(phone: &str) -> NewCustomer {
        NewCustomer {
            first_name: "Linh".into(),
            last_name: "Tran".into(),
            phone: phone.into(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_customer_phone_conflicts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let directory = db.directory();

        let first = directory.create_customer(&guest("0901 234 567")).await.unwrap();
        let err = directory.create_customer(&guest("0901 234 567")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let found = directory
            .find_customer_by_phone("0901 234 567")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn test_employee_lookup_by_email() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let directory = db.directory();

        let emp = directory
            .create_employee(&NewEmployee {
                name: "Minh".into(),
                email: "Minh@Bistro.test".into(),
                role: EmployeeRole::Staff,
            })
            .await
            .unwrap();

        let found = directory
            .find_employee_by_email("minh@bistro.test")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, emp.id);
        assert_eq!(found.role, EmployeeRole::Staff);

        let err = directory
            .create_employee(&NewEmployee {
                name: "Other".into(),
                email: "minh@bistro.test".into(),
                role: EmployeeRole::Admin,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
