mod check;
mod edit;
mod manager;
