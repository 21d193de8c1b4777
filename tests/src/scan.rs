mod integration;
mod storage;
