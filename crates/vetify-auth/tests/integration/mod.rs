mod customer_login;
mod employee_login;
